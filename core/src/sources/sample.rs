use crate::dataset::Dataset;
use crate::dataset::Record;
use crate::dataset::SourceTag;
use crate::sources::FetchContext;
use crate::sources::FetchError;
use crate::sources::SourceAdapter;
use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tracing::info;

const COLLECTED_AT: &str = "2025-06-25 10:44:53";

/// Built-in two-listing dataset used when nothing else is reachable.
pub fn sample_dataset() -> Dataset {
    Dataset {
        search_conditions: json!({
            "regions": ["서울시", "경기도"],
            "price_range": "0~6억 미만",
            "property_types": ["아파트", "오피스텔", "단독주택", "다가구주택"],
            "collected_at": COLLECTED_AT,
        }),
        records: vec![
            Record {
                id: "402604".to_string(),
                region: Some("서울시".to_string()),
                subregion: Some("용산구".to_string()),
                address: Some(
                    "서울특별시 용산구 회나무로13가길 16, 6층702호 (이태원동,어반메시 남산)"
                        .to_string(),
                ),
                lat: Some(37.540_734_7),
                lng: Some(126.990_389_5),
                property_type: Some("아파트".to_string()),
                appraised_value: Some(1_911_000_000),
                minimum_bid: Some(34_426_000),
                percent: Some(2.0),
                court: Some("서울서부지방법원".to_string()),
                auction_date: Some("2025-07-15".to_string()),
                auction_count: Some(18),
                detail_url: Some("https://map.auctionmsg.com/auction/detail/402604".to_string()),
                detail_label: Some("경매알리미 #402604".to_string()),
                extra: display_prices("19억 1100만원", "3442만원", "3.8억"),
                ..Record::default()
            },
            Record {
                id: "515468".to_string(),
                region: Some("서울시".to_string()),
                subregion: Some("강서구".to_string()),
                address: Some(
                    "서울특별시 강서구 등촌로13자길 74, 제102동 제2층 제204호 (화곡동, 태영방송인아파트)"
                        .to_string(),
                ),
                lat: Some(37.537_582_804_268_16),
                lng: Some(126.853_281_113_300_8),
                property_type: Some("아파트".to_string()),
                appraised_value: Some(455_000_000),
                minimum_bid: Some(186_368_000),
                percent: Some(41.0),
                court: Some("서울남부지방법원".to_string()),
                auction_date: Some("2025-07-10".to_string()),
                auction_count: Some(4),
                detail_url: Some("https://map.auctionmsg.com/auction/detail/515468".to_string()),
                detail_label: Some("경매알리미 #515468".to_string()),
                extra: display_prices("4억 5500만원", "1억 8636만원", "1.9억"),
                ..Record::default()
            },
        ],
        last_updated: Some(COLLECTED_AT.to_string()),
        ..Dataset::default()
    }
    .tagged(SourceTag::SampleData)
}

fn display_prices(estimated: &str, minimum: &str, map: &str) -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert("simpleminestimatedprice".to_string(), json!(estimated));
    extra.insert("simpleminprice".to_string(), json!(minimum));
    extra.insert("mapprice".to_string(), json!(map));
    extra
}

/// Terminal source; never fails.
#[derive(Debug, Default)]
pub struct SampleDataAdapter;

#[async_trait]
impl SourceAdapter for SampleDataAdapter {
    fn source(&self) -> SourceTag {
        SourceTag::SampleData
    }

    async fn fetch(&self, _ctx: &FetchContext) -> Result<Dataset, FetchError> {
        info!("serving built-in sample dataset");
        Ok(sample_dataset())
    }
}
