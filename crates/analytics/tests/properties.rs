// Property tests over generated contract rows.
// Run with: cargo test -p salesdash-analytics --test properties

use proptest::prelude::*;

use salesdash_analytics::aggregate::{per_agent_performance, promotion_ranking};
use salesdash_analytics::classify::{classify, ClassMasks};
use salesdash_analytics::coerce::ex_vat;
use salesdash_analytics::{
    match_agents, CallTimeRecord, ContractRecord, MatchOptions, ProductClass, Roster, SalesRecord,
};
use salesdash_config::{PromotionSettings, RankingMode};
use salesdash_core::AggregateTable;

const AGENTS: &[&str] = &["김부자", "이영희", "박철수", "김부자(주임)", "외부인", "fmin2", " 이영희"];
const CATEGORIES: &[&str] = &["안마의자", "라클라우드 매트리스", "정수기", "공기청정기", ""];
const SALE_TYPES: &[&str] = &["", "렌탈", "케어", "멤버십", "멤버쉽"];
const ROUNDS: &[&str] = &["V-1", "C-2", "CB-3", "캠A", "정규1", "재분배2", "기타", ""];
const INBOUND: &[&str] = &["CRM", "CRM-7", "대리점", ""];
const SALE_CHANNELS: &[&str] = &["본사", "온라인", "제휴"];

fn pick(options: &'static [&'static str]) -> impl Strategy<Value = String> {
    prop::sample::select(options).prop_map(str::to_string)
}

fn contract_strategy() -> impl Strategy<Value = ContractRecord> {
    (
        pick(AGENTS),
        pick(CATEGORIES),
        pick(SALE_TYPES),
        pick(ROUNDS),
        pick(INBOUND),
        pick(SALE_CHANNELS),
        0u32..5_000_000,
    )
        .prop_map(|(agent, category, sale_type, round, inbound, channel, gross)| {
            let gross = f64::from(gross);
            ContractRecord {
                agent,
                product_category: category,
                sale_type,
                campaign_round: round,
                sale_inbound_channel: inbound,
                sale_channel: channel,
                revenue_gross: gross,
                revenue_ex_vat: ex_vat(gross, 0.011),
                ..ContractRecord::default()
            }
        })
}

fn calls_strategy() -> impl Strategy<Value = Vec<CallTimeRecord>> {
    prop::collection::vec(
        (pick(AGENTS), 0u64..50, 1u64..20_000).prop_map(|(agent, count, secs)| CallTimeRecord {
            agent,
            call_count: count,
            call_time_display: String::new(),
            call_time_seconds: secs,
        }),
        0..6,
    )
}

fn roster() -> Roster {
    Roster {
        crm: vec!["김부자".into(), "이영희 ".into()],
        online: vec!["박철수".into()],
        ..Roster::default()
    }
}

fn column(table: &AggregateTable, name: &str) -> usize {
    table.column_index(name).unwrap()
}

fn num(table: &AggregateTable, row: &[salesdash_core::CellValue], name: &str) -> f64 {
    row[column(table, name)].as_f64().unwrap_or(0.0)
}

proptest! {
    #[test]
    fn revenue_cells_keep_the_vat_relation(rows in prop::collection::vec(contract_strategy(), 0..40)) {
        let options = MatchOptions { registered_only: false, ..MatchOptions::default() };
        let out = match_agents(&rows, &[], &roster(), &options);
        let table = per_agent_performance(&out.rollups);
        for row in &table.rows {
            let gross = num(&table, row, "매출(VAT포함)");
            let net = num(&table, row, "매출(VAT제외)");
            if gross > 0.0 {
                prop_assert!(((net * 1.011) - gross).abs() / gross < 0.01);
            } else {
                prop_assert_eq!(net, 0.0);
            }
        }
    }

    #[test]
    fn product_counts_agree_across_levels(
        rows in prop::collection::vec(contract_strategy(), 0..40),
        calls in calls_strategy(),
    ) {
        let options = MatchOptions { registered_only: false, ..MatchOptions::default() };
        let out = match_agents(&rows, &calls, &roster(), &options);
        let table = per_agent_performance(&out.rollups);
        prop_assume!(!table.rows.is_empty());

        let name_col = 1;
        for product in ProductClass::ALL {
            let label = product.label();
            let mut agent_sum = 0.0;
            let mut team_sum = 0.0;
            let mut grand = 0.0;
            for row in &table.rows {
                let name = row[name_col].as_text();
                let value = num(&table, row, label);
                if name == "총합계" {
                    grand = value;
                } else if name.ends_with("합계") {
                    team_sum += value;
                } else {
                    agent_sum += value;
                }
            }
            prop_assert_eq!(agent_sum, team_sum);
            prop_assert_eq!(team_sum, grand);
        }
    }

    #[test]
    fn classification_is_total_and_exclusive(rows in prop::collection::vec(contract_strategy(), 0..40)) {
        let masks = ClassMasks::build(&rows);
        prop_assert_eq!(masks.len(), rows.len());
        for (i, row) in rows.iter().enumerate() {
            prop_assert_eq!(masks.classification(i), classify(row));
            let hits = ProductClass::ALL
                .iter()
                .filter(|p| masks.product_mask(**p)[i])
                .count();
            prop_assert_eq!(hits, 1);
        }
    }

    #[test]
    fn matching_is_idempotent(
        rows in prop::collection::vec(contract_strategy(), 0..40),
        calls in calls_strategy(),
        registered_only in any::<bool>(),
    ) {
        let options = MatchOptions { registered_only, ..MatchOptions::default() };
        let first = match_agents(&rows, &calls, &roster(), &options);
        let second = match_agents(&rows, &calls, &roster(), &options);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn promotion_ranks_are_unique(
        rows in prop::collection::vec(contract_strategy(), 0..60),
        mode in prop::sample::select(vec![RankingMode::ByCount, RankingMode::ByAmount, RankingMode::ByProductScore]),
    ) {
        let sales: Vec<SalesRecord> = rows
            .into_iter()
            .map(|contract| SalesRecord { contract, ..SalesRecord::default() })
            .collect();
        let settings = PromotionSettings {
            analysis_mode: mode,
            include_online: true,
            include_indirect: true,
            ..PromotionSettings::default()
        };
        let options = MatchOptions { registered_only: false, ..MatchOptions::default() };
        let (table, ranking) = promotion_ranking(&sales, &roster(), &options, &settings);
        prop_assert_eq!(table.rows.len(), ranking.len());
        for (i, row) in ranking.iter().enumerate() {
            prop_assert_eq!(row.rank, i + 1);
        }
        let mut names: Vec<&str> = ranking.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        prop_assert_eq!(names.len(), ranking.len());
    }
}
