use std::collections::BTreeMap;

use salesdash_core::{AggregateTable, CellValue, TableKind};

use super::count_cell;
use crate::classify::{CampaignKind, ClassMasks};
use crate::matcher::{AgentIndex, MatchOptions};
use crate::records::ContractRecord;
use crate::registry::{Roster, Team};

pub const TITLE: &str = "신규 DB 현황";

/// Consultation status counted as a fresh lead.
pub const NEW_DB_STATUS: &str = "신규";

const KINDS: usize = CampaignKind::ALL.len();

fn columns() -> Vec<String> {
    let mut cols = vec!["상담사".to_string(), "팀".to_string()];
    cols.extend(CampaignKind::ALL.iter().map(|k| k.label().to_string()));
    cols.push("합계".to_string());
    cols
}

fn kind_slot(kind: CampaignKind) -> usize {
    CampaignKind::ALL.iter().position(|k| *k == kind).unwrap_or(KINDS - 1)
}

/// Per-agent count of 신규 consultation rows split by campaign kind.
///
/// Every active rostered agent gets a row, zero or not. Unregistered agents
/// are added only when `registered_only` is off and they have a count.
/// Rows are sorted by total (descending) then name, followed by 총합계.
pub fn new_db_counts(records: &[ContractRecord], roster: &Roster, options: &MatchOptions) -> AggregateTable {
    let profiles = roster.active_profiles();
    let index = AgentIndex::new(profiles.iter().map(|p| p.name.clone()));
    let masks = ClassMasks::build(records);

    let mut counts: BTreeMap<String, (Team, [u64; KINDS])> = profiles
        .iter()
        .map(|p| (p.name.clone(), (p.team, [0; KINDS])))
        .collect();

    for (i, record) in records.iter().enumerate() {
        if record.db_status.trim() != NEW_DB_STATUS {
            continue;
        }
        let name = record.agent.trim();
        if name.is_empty() || options.excluded_accounts.iter().any(|a| a.trim() == name) || roster.is_excluded(name) {
            continue;
        }
        let agent = match index.resolve(name) {
            Some(pos) => profiles[pos].name.clone(),
            None if !options.registered_only => name.to_string(),
            None => continue,
        };
        counts.entry(agent).or_insert((Team::Crm, [0; KINDS])).1[kind_slot(masks.campaign(i))] += 1;
    }

    let mut rows: Vec<(String, Team, [u64; KINDS])> =
        counts.into_iter().map(|(name, (team, c))| (name, team, c)).collect();
    rows.sort_by(|a, b| {
        let (ta, tb): (u64, u64) = (a.2.iter().sum(), b.2.iter().sum());
        tb.cmp(&ta).then_with(|| a.0.cmp(&b.0))
    });

    let mut table = AggregateTable::new(TableKind::NewDbCounts, TITLE, columns());
    let mut grand = [0u64; KINDS];
    for (name, team, c) in &rows {
        for (g, v) in grand.iter_mut().zip(c.iter()) {
            *g += v;
        }
        table.push_row(count_row(CellValue::text(name.clone()), CellValue::text(team.label()), c));
    }
    if !rows.is_empty() {
        table.push_row(count_row(CellValue::text("총합계"), CellValue::NULL, &grand));
    }
    table
}

fn count_row(name: CellValue, team: CellValue, counts: &[u64; KINDS]) -> Vec<CellValue> {
    let mut row = vec![name, team];
    row.extend(counts.iter().map(|c| count_cell(*c)));
    row.push(count_cell(counts.iter().sum()));
    row
}
