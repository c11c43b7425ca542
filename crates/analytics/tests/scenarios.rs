// End-to-end runs of the pipeline over small delimited-text exports.
// Run with: cargo test -p salesdash-analytics --test scenarios

use chrono::NaiveDate;
use salesdash_analytics::aggregate::per_agent_performance;
use salesdash_analytics::{
    AnalysisRequest, ErrorKind, FixedClock, InputFile, InputKind, Pipeline, Stage, Variant, Warning,
};
use salesdash_config::{LoadedConfig, MinimumCriteria, PipelineSettings, PromotionSettings, RosterFile};
use salesdash_core::{CellValue, SheetContent};

const SALES_HEADER: &str = "상담사,대분류,일반회차 캠페인,판매인입경로,판매채널,주문 일자,월 렌탈 금액,약정 기간 값,총 패키지 할인 회차,판매 금액,선납 렌탈 금액";
const CONTRACT_HEADER: &str = "상담사,대분류,일반회차 캠페인,판매인입경로,판매채널,상담DB상태,주문번호,매출 금액";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn pipeline_with(config: LoadedConfig) -> Pipeline {
    Pipeline::new(PipelineSettings::default(), config)
        .unwrap()
        .with_clock(FixedClock(date(2024, 3, 8)))
}

fn roster(crm: &[&str]) -> LoadedConfig {
    let json = serde_json::json!({ "CRM팀": crm, "온라인팀": ["박온라인"] }).to_string();
    LoadedConfig {
        roster: RosterFile::from_json(&json).unwrap(),
        ..LoadedConfig::default()
    }
}

fn csv(header: &str, rows: &[String]) -> Vec<u8> {
    let mut out = format!("{header}\n");
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    out.into_bytes()
}

/// Contract exports carry two title lines above the header.
fn contract_csv(rows: &[String]) -> Vec<u8> {
    let mut bytes = "상담 현황\n조회기간 2024-03\n".as_bytes().to_vec();
    bytes.extend(csv(CONTRACT_HEADER, rows));
    bytes
}

fn sale(agent: &str, category: &str, round: &str, inbound: &str, day: &str) -> String {
    format!("{agent},{category},{round},{inbound},본사,{day},30000,60,60,100000,0")
}

fn contract(agent: &str, round: &str, status: &str, order: &str) -> String {
    format!("{agent},안마의자,{round},CRM,본사,{status},{order},1011000")
}

fn number(v: f64) -> Option<CellValue> {
    Some(CellValue::number(v))
}

#[test]
fn s1_revenue_with_sanitized_package_discount() {
    let mut p = pipeline_with(roster(&["김부자"]));
    let sales = csv(SALES_HEADER, &[sale("김부자", "안마의자", "V-1", "CRM", "2024-03-08")]);
    let report = p
        .run(&AnalysisRequest::new(Variant::Promotion, vec![InputFile::new(InputKind::Sales, "approved.csv", sales)]))
        .unwrap();

    let row = &report.ranking[0];
    assert_eq!(row.tally.total_gross(), 1_900_000.0);
    assert!((row.tally.total_ex_vat() - 1_879_327.4).abs() < 0.1);
    assert!((row.tally.total_ex_vat() * 1.011 - row.tally.total_gross()).abs() < 1e-6);
}

#[test]
fn s2_channels_in_the_daily_rollup() {
    let mut p = pipeline_with(roster(&[]));
    let rows = vec![
        sale("가", "안마의자", "CB-spring", "CRM-1", "2024-03-08"),
        sale("가", "안마의자", "V-a", "CRM-2", "2024-03-08"),
        sale("가", "안마의자", "정규1", "affiliate-7", "2024-03-08"),
        sale("가", "안마의자", "", "CRM-3", "2024-03-08"),
    ];
    let request = AnalysisRequest::new(
        Variant::DailySales,
        vec![InputFile::new(InputKind::Sales, "approved.csv", csv(SALES_HEADER, &rows))],
    );
    let report = p.run(&request).unwrap();
    assert_eq!(report.date, Some(date(2024, 3, 8)));

    let daily = &report.tables[0];
    assert_eq!(daily.value("안마의자", "총건수"), number(4.0).as_ref());
    assert_eq!(daily.value("안마의자", "온라인건수"), number(1.0).as_ref());
    assert_eq!(daily.value("안마의자", "본사건수"), number(1.0).as_ref());
    assert_eq!(daily.value("안마의자", "연계건수"), number(1.0).as_ref());

    assert_eq!(report.plan.sheet_names(), vec!["매출현황", "승인매출"]);
    match &report.plan.sheets[0].content {
        SheetContent::Tables { tables } => assert_eq!(tables.len(), 4),
        other => panic!("unexpected content {other:?}"),
    }
}

#[test]
fn s3_call_time_parsing() {
    let mut p = pipeline_with(roster(&["김부자", "이영희", "최민수", "정다운"]));
    let calls = csv(
        "상담원명,총 건수,총 시간",
        &[
            "김부자,10,2:34:18".to_string(),
            "이영희,5,45:07".to_string(),
            "최민수,3,300".to_string(),
            "정다운,0,0:00:00".to_string(),
            "휴식,1,0:10:00".to_string(),
        ],
    );
    let contracts = contract_csv(&[contract("김부자", "V-1", "주문승인", "o1")]);
    let request = AnalysisRequest::new(
        Variant::AgentPerformance,
        vec![
            InputFile::new(InputKind::Contract, "contracts.csv", contracts),
            InputFile::new(InputKind::CallTime, "calls.csv", calls),
        ],
    );
    let report = p.run(&request).unwrap();
    let table = &report.tables[0];
    let secs = table.column_index("콜타임(초)").unwrap();
    let by_name = |name: &str| table.find_row(1, name).map(|r| r[secs].clone());

    assert_eq!(by_name("김부자"), Some(CellValue::number(9258.0)));
    assert_eq!(by_name("이영희"), Some(CellValue::number(2707.0)));
    assert_eq!(by_name("최민수"), Some(CellValue::number(300.0)));
    assert_eq!(by_name("정다운"), Some(CellValue::number(0.0)));
    assert!(!report.warnings.iter().any(|w| matches!(w, Warning::AgentMatchMiss { .. })));
}

#[test]
fn filtered_out_contracts_still_yield_a_full_schema() {
    let mut p = pipeline_with(roster(&["김부자", "이영희"]));
    let rows: Vec<String> = ["o1", "o2", "o3"]
        .iter()
        .map(|order| format!("김부자,안마의자,V-1,CRM,대리점,주문승인,{order},1011000"))
        .collect();
    let request = AnalysisRequest::new(
        Variant::AgentPerformance,
        vec![InputFile::new(InputKind::Contract, "contracts.csv", contract_csv(&rows))],
    );
    let report = p.run(&request).unwrap();

    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::EmptyAfterFiltering { .. })));

    let table = &report.tables[0];
    assert_eq!(table.title, "상담원 실적");
    assert_eq!(table.columns, per_agent_performance(&[]).columns);
    let total = table.column_index("총건수").unwrap();
    let revenue = table.column_index("매출(VAT포함)").unwrap();
    for name in ["김부자", "이영희", "총합계"] {
        let row = table.find_row(1, name).unwrap_or_else(|| panic!("missing row {name}"));
        assert_eq!(row.len(), table.columns.len());
        assert_eq!(row[total], CellValue::number(0.0), "{name}");
        assert_eq!(row[revenue], CellValue::number(0.0), "{name}");
    }

    match &report.plan.get("필터링된 원본 데이터").unwrap().content {
        SheetContent::Raw(slice) => assert!(slice.rows.is_empty()),
        other => panic!("unexpected content {other:?}"),
    }
}

#[test]
fn call_rows_for_unknown_agents_are_counted() {
    let mut p = pipeline_with(roster(&["김부자"]));
    let calls = csv(
        "상담원명,총 건수,총 시간",
        &[
            "김부자,10,1:00:00".to_string(),
            "유령,4,0:20:00".to_string(),
            "외부인,2,0:05:00".to_string(),
        ],
    );
    let contracts = contract_csv(&[contract("김부자", "V-1", "주문승인", "o1")]);
    let request = AnalysisRequest::new(
        Variant::AgentPerformance,
        vec![
            InputFile::new(InputKind::Contract, "contracts.csv", contracts),
            InputFile::new(InputKind::CallTime, "calls.csv", calls),
        ],
    );
    let report = p.run(&request).unwrap();

    let misses: Vec<usize> = report
        .warnings
        .iter()
        .filter_map(|w| match w {
            Warning::AgentMatchMiss { count } => Some(*count),
            _ => None,
        })
        .collect();
    assert_eq!(misses, vec![2]);

    let table = &report.tables[0];
    let secs = table.column_index("콜타임(초)").unwrap();
    assert_eq!(table.find_row(1, "김부자").unwrap()[secs], CellValue::number(3600.0));
    assert!(table.find_row(1, "유령").is_none());
}

#[test]
fn s4_agent_substring_matching() {
    let mut p = pipeline_with(roster(&["김부자"]));
    let contracts = contract_csv(&[
        contract("김부자", "V-1", "주문승인", "o1"),
        contract("김부자 ", "V-1", "주문승인", "o2"),
        contract("김부자(주임)", "V-1", "주문승인", "o3"),
        contract("김", "V-1", "주문승인", "o4"),
    ]);
    let request = AnalysisRequest::new(
        Variant::AgentPerformance,
        vec![InputFile::new(InputKind::Contract, "contracts.csv", contracts)],
    );
    let report = p.run(&request).unwrap();

    let table = &report.tables[0];
    let total = table.column_index("총건수").unwrap();
    assert_eq!(table.find_row(1, "김부자").unwrap()[total], CellValue::number(3.0));
    assert!(table.find_row(1, "김").is_none());

    match &report.plan.get("필터링된 원본 데이터").unwrap().content {
        SheetContent::Raw(slice) => assert_eq!(slice.rows.len(), 3),
        other => panic!("unexpected content {other:?}"),
    }
}

#[test]
fn s5_campaign_status_pivot() {
    let mut p = pipeline_with(roster(&[]));
    let contracts = contract_csv(&[contract("가", "캠A", "주문승인", ""), contract("나", "캠A", "신규", "")]);
    let request = AnalysisRequest::new(
        Variant::CampaignStatus,
        vec![InputFile::new(InputKind::Contract, "contracts.csv", contracts)],
    );
    let report = p.run(&request).unwrap();
    let t = &report.tables[0];
    assert_eq!(t.value("캠A", "주문승인"), number(1.0).as_ref());
    assert_eq!(t.value("캠A", "신규"), number(1.0).as_ref());
    assert_eq!(t.value("캠A", "총합계"), number(2.0).as_ref());
    assert_eq!(t.value("캠A", "전환율"), number(50.0).as_ref());
}

#[test]
fn s6_promotion_ranking_by_count() {
    let mut config = roster(&["가", "나", "다"]);
    config.promotion = PromotionSettings {
        minimum_criteria: MinimumCriteria { count: 7 },
        ..PromotionSettings::default()
    };
    let mut p = pipeline_with(config);

    let mut rows = Vec::new();
    for (agent, n) in [("가", 10), ("나", 7), ("다", 6)] {
        for _ in 0..n {
            rows.push(sale(agent, "안마의자", "V-1", "CRM", "2024-03-05"));
        }
    }
    let request = AnalysisRequest::new(
        Variant::Promotion,
        vec![InputFile::new(InputKind::Sales, "approved.csv", csv(SALES_HEADER, &rows))],
    );
    let report = p.run(&request).unwrap();

    assert_eq!(report.tables[0].rows.len(), 2);
    let ranked: Vec<(usize, &str, &str)> = report
        .ranking
        .iter()
        .map(|r| (r.rank, r.name.as_str(), r.award.as_str()))
        .collect();
    assert_eq!(ranked, vec![(1, "가", "수상"), (2, "나", "수상")]);
}

#[test]
fn missing_fatal_column_names_stage_and_column() {
    let mut p = pipeline_with(roster(&["김부자"]));
    let bytes = "제목\n부제\n상담사,일반회차 캠페인\n김부자,V-1\n".as_bytes().to_vec();
    let err = p
        .run(&AnalysisRequest::new(
            Variant::AgentPerformance,
            vec![InputFile::new(InputKind::Contract, "contracts.csv", bytes)],
        ))
        .unwrap_err();
    assert_eq!(err.stage, Stage::Normalize);
    assert_eq!(
        err.kind,
        ErrorKind::MissingRequiredColumn {
            kind: InputKind::Contract,
            column: "product_category".into()
        }
    );
}

#[test]
fn files_of_one_kind_are_merged() {
    let mut p = pipeline_with(roster(&[]));
    let first = csv(SALES_HEADER, &[sale("가", "정수기", "V-1", "CRM", "2024-03-07")]);
    let second = csv(SALES_HEADER, &[sale("나", "정수기", "V-1", "CRM", "2024-03-07")]);
    let request = AnalysisRequest::new(
        Variant::DailySales,
        vec![
            InputFile::new(InputKind::Sales, "a.csv", first),
            InputFile::new(InputKind::Sales, "b.csv", second),
        ],
    )
    .with_date(date(2024, 3, 7));
    let report = p.run(&request).unwrap();
    assert_eq!(report.tables[0].value("정수기", "총건수"), number(2.0).as_ref());
}

#[test]
fn repeated_runs_are_identical() {
    let contracts = contract_csv(&[
        contract("김부자", "V-1", "주문승인", "o1"),
        contract("이영희", "캠B", "신규", "o2"),
    ]);
    let request = AnalysisRequest::new(
        Variant::NewDb,
        vec![InputFile::new(InputKind::Contract, "contracts.csv", contracts)],
    );
    let first = pipeline_with(roster(&["김부자", "이영희"])).run(&request).unwrap();
    let second = pipeline_with(roster(&["김부자", "이영희"])).run(&request).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.tables[0].value("이영희", "캠페인"), number(1.0).as_ref());

    let mut cached = pipeline_with(roster(&["김부자", "이영희"]));
    let a = cached.run(&request).unwrap();
    let b = cached.run(&request).unwrap();
    assert_eq!(a, b);
}
