use salesdash_core::{AggregateTable, CellValue, TableKind};

use super::{count_cell, round_to, PRODUCT_COLUMNS};
use crate::coerce::format_duration;
use crate::matcher::{AgentRollup, ProductTally};
use crate::registry::Team;

pub const TITLE: &str = "상담원 실적";

fn columns() -> Vec<String> {
    let mut cols = vec!["팀".to_string(), "상담사".to_string()];
    cols.extend(PRODUCT_COLUMNS.iter().map(|p| p.label().to_string()));
    cols.extend(
        ["총건수", "매출(VAT포함)", "매출(VAT제외)", "콜건수", "콜타임", "콜타임(초)"]
            .iter()
            .map(|s| s.to_string()),
    );
    cols
}

/// Per-agent performance: agents grouped by team (CRM first), each group
/// sorted by total count then call time (both descending) and closed by a
/// team summary row; a grand-total row comes last.
///
/// Summary rows sum counts and revenues. Call metrics in summary rows are
/// means over the agents with a non-zero value.
pub fn per_agent_performance(rollups: &[AgentRollup]) -> AggregateTable {
    let mut table = AggregateTable::new(TableKind::PerAgentPerformance, TITLE, columns());

    let mut all: Vec<&AgentRollup> = Vec::new();
    for team in [Team::Crm, Team::Online] {
        let mut members: Vec<&AgentRollup> = rollups.iter().filter(|r| r.team == team).collect();
        if members.is_empty() {
            continue;
        }
        members.sort_by(|a, b| {
            b.total_count()
                .cmp(&a.total_count())
                .then(b.call_time_seconds.cmp(&a.call_time_seconds))
                .then(a.name.cmp(&b.name))
        });
        for r in &members {
            table.push_row(agent_row(r));
        }
        table.push_row(summary_row(team.label(), &format!("{} 합계", team.label()), &members));
        all.extend(members);
    }

    if !all.is_empty() {
        table.push_row(summary_row("전체", "총합계", &all));
    }
    table
}

fn agent_row(r: &AgentRollup) -> Vec<CellValue> {
    let mut row = vec![CellValue::text(r.team.label()), CellValue::text(r.name.clone())];
    row.extend(tally_cells(&r.tally));
    row.push(count_cell(r.call_count));
    row.push(CellValue::text(r.call_time_display.clone()));
    row.push(count_cell(r.call_time_seconds));
    row
}

fn tally_cells(tally: &ProductTally) -> Vec<CellValue> {
    let mut cells: Vec<CellValue> = PRODUCT_COLUMNS.iter().map(|p| count_cell(tally.count(*p))).collect();
    cells.push(count_cell(tally.total_count()));
    cells.push(CellValue::number(tally.total_gross()));
    cells.push(CellValue::number(tally.total_ex_vat()));
    cells
}

fn summary_row(team: &str, label: &str, members: &[&AgentRollup]) -> Vec<CellValue> {
    let mut tally = ProductTally::default();
    for r in members {
        tally.merge(&r.tally);
    }
    let mean_calls = nonzero_mean(members.iter().map(|r| r.call_count as f64));
    let mean_secs = nonzero_mean(members.iter().map(|r| r.call_time_seconds as f64)).round();

    let mut row = vec![CellValue::text(team), CellValue::text(label)];
    row.extend(tally_cells(&tally));
    row.push(CellValue::number(round_to(mean_calls, 1)));
    row.push(CellValue::text(format_duration(mean_secs as u64)));
    row.push(CellValue::number(mean_secs));
    row
}

fn nonzero_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.filter(|v| *v > 0.0).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ProductClass;

    fn rollup(name: &str, team: Team, chairs: u64, secs: u64) -> AgentRollup {
        let mut tally = ProductTally::default();
        for _ in 0..chairs {
            tally.add(ProductClass::Chair, 1011.0, 1000.0);
        }
        AgentRollup {
            name: name.into(),
            team,
            registered: true,
            tally,
            call_count: if secs > 0 { 10 } else { 0 },
            call_time_seconds: secs,
            call_time_display: format_duration(secs),
        }
    }

    #[test]
    fn sorted_within_team_with_summaries() {
        let rollups = vec![
            rollup("가", Team::Crm, 1, 100),
            rollup("나", Team::Crm, 3, 50),
            rollup("다", Team::Crm, 1, 300),
            rollup("라", Team::Online, 2, 0),
        ];
        let t = per_agent_performance(&rollups);
        let names: Vec<String> = t.rows.iter().map(|r| r[1].as_text().into_owned()).collect();
        assert_eq!(names, vec!["나", "다", "가", "CRM팀 합계", "라", "온라인팀 합계", "총합계"]);

        // mean of 100, 50, 300 seconds
        let crm_summary = &t.rows[3];
        assert_eq!(crm_summary[t.column_index("총건수").unwrap()], CellValue::number(5.0));
        assert_eq!(crm_summary[t.column_index("콜타임(초)").unwrap()], CellValue::number(150.0));
        assert_eq!(crm_summary[t.column_index("콜타임").unwrap()], CellValue::text("0:02:30"));
        // online team has no calls: mean over nobody is zero
        assert_eq!(t.rows[5][t.column_index("콜건수").unwrap()], CellValue::number(0.0));
        assert_eq!(t.rows[6][t.column_index("안마의자").unwrap()], CellValue::number(7.0));
    }

    #[test]
    fn empty_input_keeps_schema() {
        let t = per_agent_performance(&[]);
        assert!(t.is_empty());
        assert_eq!(t.columns.len(), 2 + 6 + 6);
    }
}
