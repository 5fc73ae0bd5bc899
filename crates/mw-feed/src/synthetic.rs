use chrono::Duration;
use mw_schemas::{InventoryRecord, OrderRecord, SupplierPayload};
use sha2::{Digest, Sha256};

use crate::{FeedError, FeedRequest, SupplierFeed};

/// Suppliers the reference deployment can register connectors for.
pub const SUPPORTED_SUPPLIERS: &[&str] = &[
    "MetroLumber",
    "BayDrywall",
    "PacificConcrete",
    "GoldenStateSteel",
    "NorCalElectrical",
];

pub fn supplier_supported(name: &str) -> bool {
    SUPPORTED_SUPPLIERS.contains(&name)
}

/// SKU catalog shared by every synthetic supplier: (sku, material name).
const SKU_CATALOG: &[(&str, &str)] = &[
    ("DRYWALL_58", "Drywall Sheet 5/8"),
    ("LBR_2X4_8", "Stud Lumber 2x4x8"),
    ("PLYWOOD_34", "Plywood 3/4"),
    ("STEEL_BEAM_I", "I-Beam Structural Steel"),
    ("ELEC_PANEL_200A", "Electrical Panel 200A"),
    ("CONC_READY_4K", "Ready Mix Concrete 4K PSI"),
];

const PROJECT_IDS: &[&str] = &["P-1001", "P-1002", "P-1015", "P-1099"];

// ---------------------------------------------------------------------------
// Deterministic stream
// ---------------------------------------------------------------------------

/// SplitMix64 over a sha256-derived seed. Not cryptographic; it only has
/// to be stable across platforms and runs for a given seed string.
struct DetStream {
    state: u64,
}

impl DetStream {
    fn from_seed(seed: &str) -> Self {
        let digest = Sha256::digest(seed.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self {
            state: u64::from_be_bytes(bytes),
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Inclusive integer range.
    fn int_in(&mut self, lo: i64, hi: i64) -> i64 {
        debug_assert!(lo <= hi);
        let span = (hi - lo + 1) as u64;
        lo + (self.next_u64() % span) as i64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    fn choice<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// SyntheticFeed
// ---------------------------------------------------------------------------

/// Deterministic pseudo-random supplier feed.
///
/// The stream is seeded by `"{supplier}:{connector}:{YYYY-MM-DD}"`: the same
/// connector yields the identical payload for the whole UTC day, and a new
/// one the next day. Unknown suppliers yield an empty payload rather than
/// an error; registration is where supplier support is enforced.
#[derive(Debug, Default)]
pub struct SyntheticFeed;

impl SyntheticFeed {
    pub fn new() -> Self {
        Self
    }
}

impl SupplierFeed for SyntheticFeed {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn fetch(&self, req: &FeedRequest) -> Result<SupplierPayload, FeedError> {
        if !supplier_supported(&req.supplier_name) {
            return Ok(SupplierPayload::empty());
        }

        let day = req.now.date_naive();
        let seed = format!("{}:{}:{}", req.supplier_name, req.connector_id, day);
        let mut stream = DetStream::from_seed(&seed);

        // Anchor every timestamp to the day, not the wall clock: a repeat
        // fetch later the same day must hash identically so reconciliation
        // takes the no-op path.
        let day_anchor = day
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(req.now);

        let prefix: String = req
            .supplier_name
            .chars()
            .take(3)
            .collect::<String>()
            .to_uppercase();

        let mut inventory = Vec::with_capacity(SKU_CATALOG.len());
        let mut orders = Vec::with_capacity(SKU_CATALOG.len());

        for (idx, (sku, material_name)) in SKU_CATALOG.iter().enumerate() {
            let qty_ordered = stream.int_in(30, 180) as f64;
            let qty_delivered = stream.int_in(0, (qty_ordered * 0.65) as i64) as f64;
            let qty_available = stream.int_in(0, 220) as f64;
            let eta_days = stream.int_in(-2, 18);
            let impact_lag_days = stream.int_in(1, 3);
            let late_rate = round2(stream.uniform(0.05, 0.8));
            let eta_volatility_days = round2(stream.uniform(0.0, 6.0));
            let lead_time_trend_days = round2(stream.uniform(-2.0, 12.0));
            let source_age_hours = stream.int_in(0, 72);
            let inventory_age_hours = stream.int_in(0, 72);
            let project_id = stream.choice(PROJECT_IDS).to_string();

            let eta_date = day + Duration::days(eta_days);
            let source_timestamp = day_anchor - Duration::hours(source_age_hours);

            inventory.push(InventoryRecord {
                supplier_sku: (*sku).to_string(),
                qty_available,
                // A slice of observations lands beyond the 48h staleness
                // threshold so the stale path gets exercised end to end.
                source_timestamp: day_anchor - Duration::hours(inventory_age_hours),
            });

            orders.push(OrderRecord {
                supplier_order_id: format!("{prefix}-SO-{}", idx + 1),
                supplier_sku: (*sku).to_string(),
                material_name: (*material_name).to_string(),
                project_id: Some(project_id),
                qty_ordered,
                qty_delivered,
                eta_date: Some(eta_date),
                impact_date: Some(eta_date + Duration::days(impact_lag_days)),
                status: None,
                historical_late_rate: Some(late_rate),
                eta_volatility_days: Some(eta_volatility_days),
                lead_time_trend_days: Some(lead_time_trend_days),
                source_timestamp,
            });
        }

        Ok(SupplierPayload { inventory, orders })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn req_at(hour: u32) -> FeedRequest {
        FeedRequest {
            supplier_name: "MetroLumber".to_string(),
            connector_id: "conn-123".to_string(),
            now: Utc.with_ymd_and_hms(2026, 3, 10, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn same_connector_same_day_is_identical() {
        let feed = SyntheticFeed::new();
        let a = feed.fetch(&req_at(8)).unwrap();
        let b = feed.fetch(&req_at(8)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn later_fetch_same_day_is_byte_identical() {
        // Timestamps are day-anchored, so even a fetch twelve hours later
        // reproduces the payload exactly; the reconciliation no-op path
        // depends on this.
        let feed = SyntheticFeed::new();
        let morning = feed.fetch(&req_at(8)).unwrap();
        let evening = feed.fetch(&req_at(20)).unwrap();
        assert_eq!(morning, evening);
    }

    #[test]
    fn different_day_changes_the_payload() {
        let feed = SyntheticFeed::new();
        let today = feed.fetch(&req_at(8)).unwrap();
        let tomorrow = feed
            .fetch(&FeedRequest {
                now: Utc.with_ymd_and_hms(2026, 3, 11, 8, 0, 0).unwrap(),
                ..req_at(8)
            })
            .unwrap();
        assert_ne!(
            today.orders.iter().map(|o| o.qty_ordered).collect::<Vec<_>>(),
            tomorrow
                .orders
                .iter()
                .map(|o| o.qty_ordered)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn different_connectors_diverge() {
        let feed = SyntheticFeed::new();
        let a = feed.fetch(&req_at(8)).unwrap();
        let b = feed
            .fetch(&FeedRequest {
                connector_id: "conn-456".to_string(),
                ..req_at(8)
            })
            .unwrap();
        assert_ne!(a.orders, b.orders);
    }

    #[test]
    fn unsupported_supplier_yields_empty_payload() {
        let feed = SyntheticFeed::new();
        let payload = feed
            .fetch(&FeedRequest {
                supplier_name: "NoSuchCo".to_string(),
                ..req_at(8)
            })
            .unwrap();
        assert!(payload.inventory.is_empty());
        assert!(payload.orders.is_empty());
    }

    #[test]
    fn payload_covers_full_catalog_with_sane_ranges() {
        let feed = SyntheticFeed::new();
        let payload = feed.fetch(&req_at(8)).unwrap();
        assert_eq!(payload.inventory.len(), SKU_CATALOG.len());
        assert_eq!(payload.orders.len(), SKU_CATALOG.len());
        for order in &payload.orders {
            assert!(order.qty_ordered >= 30.0 && order.qty_ordered <= 180.0);
            assert!(order.qty_delivered <= order.qty_ordered * 0.65);
            assert!(order.supplier_order_id.starts_with("MET-SO-"));
            let late = order.historical_late_rate.unwrap();
            assert!((0.05..=0.8).contains(&late));
        }
    }

    #[test]
    fn order_ids_are_stable_natural_keys() {
        let feed = SyntheticFeed::new();
        let payload = feed.fetch(&req_at(8)).unwrap();
        let ids: Vec<_> = payload
            .orders
            .iter()
            .map(|o| o.supplier_order_id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec!["MET-SO-1", "MET-SO-2", "MET-SO-3", "MET-SO-4", "MET-SO-5", "MET-SO-6"]
        );
    }
}
