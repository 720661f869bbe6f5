/// 경매 출품작 카탈로그
/// 디지털 아트 메타데이터는 정적 조회만 한다 (파일 저장은 다루지 않음).
// region:    --- Imports
use serde::Serialize;

// endregion: --- Imports

// region:    --- Catalog
/// 디지털 아트 메타데이터
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitalAsset {
    pub item_id: &'static str,
    pub title: &'static str,
    pub artist: &'static str,
    pub description: String,
    pub license_type: &'static str,
}

const ARTIST: &str = "Hanoi Boi";
const LICENSE_TYPE: &str = "personal_use";

/// (출품작 id, 작품명) 정적 목록
const ITEMS: [(&str, &str); 5] = [
    ("art_piece_1", "Chomp Bomper One"),
    ("art_piece_2", "Chomp Bomper Two"),
    ("art_piece_3", "Chomp Bomper Three"),
    ("art_piece_4", "Chomp Bomper Four"),
    ("art_piece_5", "Chomp Bomper Five"),
];

/// 모든 출품작 id
pub fn item_ids() -> impl Iterator<Item = &'static str> {
    ITEMS.iter().map(|(id, _)| *id)
}

/// 출품작 메타데이터 조회
pub fn asset_for(item_id: &str) -> Option<DigitalAsset> {
    ITEMS
        .iter()
        .find(|(id, _)| *id == item_id)
        .map(|(id, title)| DigitalAsset {
            item_id: id,
            title,
            artist: ARTIST,
            description: format!("Original digital artwork \"{title}\" by {ARTIST}"),
            license_type: LICENSE_TYPE,
        })
}
// endregion: --- Catalog

// endregion: --- Tests
