use std::cmp::Ordering;
use std::collections::BTreeMap;

use salesdash_config::{PromotionSettings, RankingMode};
use salesdash_core::{AggregateTable, CellValue, TableKind};

use super::{count_cell, round_to};
use crate::classify::{Channel, ClassMasks, ProductClass};
use crate::matcher::{AgentIndex, MatchOptions, ProductTally};
use crate::records::SalesRecord;
use crate::registry::{Roster, Team};

pub const TITLE: &str = "프로모션 순위";

const RANKED_PRODUCTS: [ProductClass; 5] = [
    ProductClass::Chair,
    ProductClass::Mattress,
    ProductClass::Water,
    ProductClass::CareService,
    ProductClass::Membership,
];

const AWARDED: &str = "수상";

/// Shared login used for test orders; never ranked, whatever the settings say.
const SHARED_ACCOUNT: &str = "fmin2";

/// One ranked agent.
#[derive(Debug, Clone, PartialEq)]
pub struct PromotionRow {
    pub rank: usize,
    pub name: String,
    pub team: Team,
    pub tally: ProductTally,
    pub score: f64,
    /// Tier name, `수상`, or empty.
    pub award: String,
}

fn columns() -> Vec<String> {
    let mut cols = vec!["순위".to_string(), "상담사".to_string(), "팀".to_string()];
    cols.extend(RANKED_PRODUCTS.iter().map(|p| p.label().to_string()));
    cols.extend(["총건수", "총매출", "점수", "시상"].iter().map(|s| s.to_string()));
    cols
}

fn channel_allowed(channel: Channel, settings: &PromotionSettings) -> bool {
    match channel {
        Channel::Direct => true,
        Channel::Online => settings.include_online,
        Channel::Affiliate | Channel::Unknown => settings.include_indirect,
    }
}

fn product_allowed(product: ProductClass, settings: &PromotionSettings) -> bool {
    if product == ProductClass::Other {
        return false;
    }
    if product.is_service() && !settings.include_service_products {
        return false;
    }
    settings.includes_product(product.key())
}

/// Rank agents for a promotion period.
///
/// Rows are filtered by date range, excluded accounts, channel and product;
/// agents below the minimum count are dropped before ranking. Ranks are
/// sequential from 1 in mode order (count, VAT-excluded amount or weighted
/// score, descending; name ascending on ties).
pub fn promotion_ranking(
    records: &[SalesRecord],
    roster: &Roster,
    options: &MatchOptions,
    settings: &PromotionSettings,
) -> (AggregateTable, Vec<PromotionRow>) {
    let profiles = roster.active_profiles();
    let index = AgentIndex::new(profiles.iter().map(|p| p.name.clone()));
    let masks = ClassMasks::build(records);

    // (name, team) -> tally
    let mut tallies: BTreeMap<String, (Team, ProductTally)> = BTreeMap::new();
    for (i, record) in records.iter().enumerate() {
        let c = &record.contract;
        let name = c.agent.trim();
        if name.is_empty()
            || name == SHARED_ACCOUNT
            || options.excluded_accounts.iter().any(|a| a.trim() == name)
            || roster.is_excluded(name)
        {
            continue;
        }
        if !settings.date_range.is_unbounded() {
            match c.order_day() {
                Some(day) if settings.date_range.contains(day) => {}
                _ => continue,
            }
        }
        if !channel_allowed(masks.channel(i), settings) || !product_allowed(masks.product(i), settings) {
            continue;
        }
        let (agent, team) = match index.resolve(name) {
            Some(pos) => (profiles[pos].name.clone(), profiles[pos].team),
            None if !options.registered_only => (name.to_string(), Team::Crm),
            None => continue,
        };
        if team == Team::Online && !settings.include_online {
            continue;
        }
        tallies
            .entry(agent)
            .or_insert_with(|| (team, ProductTally::default()))
            .1
            .add(masks.product(i), c.revenue_gross, c.revenue_ex_vat);
    }

    let min_count = u64::from(settings.minimum_criteria.count);
    let mut ranked: Vec<PromotionRow> = tallies
        .into_iter()
        .filter(|(_, (_, tally))| tally.total_count() >= min_count)
        .map(|(name, (team, tally))| {
            let score = RANKED_PRODUCTS
                .iter()
                .map(|p| tally.count(*p) as f64 * settings.weight(p.key()))
                .sum();
            PromotionRow {
                rank: 0,
                name,
                team,
                tally,
                score,
                award: String::new(),
            }
        })
        .collect();

    ranked.sort_by(|a, b| mode_order(settings.analysis_mode, a, b).then_with(|| a.name.cmp(&b.name)));

    for (i, row) in ranked.iter_mut().enumerate() {
        row.rank = i + 1;
        row.award = match settings.analysis_mode {
            RankingMode::ByProductScore => settings
                .tier_for(row.score)
                .map(|t| t.name.clone())
                .unwrap_or_default(),
            _ if row.rank <= settings.award_slots => AWARDED.to_string(),
            _ => String::new(),
        };
    }

    let mut table = AggregateTable::new(TableKind::PromotionRanking, TITLE, columns());
    for row in &ranked {
        let mut cells = vec![
            count_cell(row.rank as u64),
            CellValue::text(row.name.clone()),
            CellValue::text(row.team.label()),
        ];
        cells.extend(RANKED_PRODUCTS.iter().map(|p| count_cell(row.tally.count(*p))));
        cells.push(count_cell(row.tally.total_count()));
        cells.push(CellValue::number(row.tally.total_ex_vat()));
        cells.push(CellValue::number(round_to(row.score, 2)));
        cells.push(CellValue::text(row.award.clone()));
        table.push_row(cells);
    }
    (table, ranked)
}

/// Descending by the mode's key.
fn mode_order(mode: RankingMode, a: &PromotionRow, b: &PromotionRow) -> Ordering {
    match mode {
        RankingMode::ByCount => b.tally.total_count().cmp(&a.tally.total_count()),
        RankingMode::ByAmount => b.tally.total_ex_vat().total_cmp(&a.tally.total_ex_vat()),
        RankingMode::ByProductScore => b.score.total_cmp(&a.score),
    }
}
