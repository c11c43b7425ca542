// Pipeline orchestrator: read → normalize → coerce → classify → match →
// aggregate → plan, once per analysis request.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use salesdash_config::{LoadedConfig, PipelineSettings, PromotionSettings, RevenueTargets};
use salesdash_core::{AggregateTable, RawSheet, SheetPlan};
use salesdash_io::ReadOptions;

use crate::aggregate::{
    campaign_by_status, daily_product_rollup, new_db_counts, per_agent_performance, product_display_order,
    promotion_ranking, target_achievement, PromotionRow,
};
use crate::cache::{digest_inputs, CacheKey, ResultCache};
use crate::calendar::{choose_report_date, BusinessCalendar, Clock, SystemClock, WeekdayCalendar};
use crate::error::{ErrorKind, PipelineError, Stage, Warning};
use crate::matcher::{match_agents, MatchOptions};
use crate::planner::{
    plan_sheets, sample_seed, RawSource, APPROVED_RAW_SHEET, FILTERED_RAW_SHEET, INSTALLED_RAW_SHEET,
};
use crate::records::{call_time_records, contract_records, sales_records, SalesRecord};
use crate::registry::Roster;
use crate::schema::{col, normalize, InputKind, NormalizedSheet};

// ---------------------------------------------------------------------------
// Requests and reports
// ---------------------------------------------------------------------------

/// Which analysis to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    AgentPerformance,
    DailySales,
    CampaignStatus,
    Promotion,
    NewDb,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Self::AgentPerformance,
        Self::DailySales,
        Self::CampaignStatus,
        Self::Promotion,
        Self::NewDb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgentPerformance => "agent_performance",
            Self::DailySales => "daily_sales",
            Self::CampaignStatus => "campaign_status",
            Self::Promotion => "promotion",
            Self::NewDb => "new_db",
        }
    }

    /// The input kind the analysis cannot run without.
    pub fn primary_input(&self) -> InputKind {
        match self {
            Self::AgentPerformance | Self::CampaignStatus | Self::NewDb => InputKind::Contract,
            Self::DailySales | Self::Promotion => InputKind::Sales,
        }
    }

    /// Canonical columns of the primary input whose absence is fatal.
    pub fn fatal_columns(&self) -> &'static [&'static str] {
        match self {
            Self::AgentPerformance => &[col::AGENT, col::PRODUCT_CATEGORY],
            Self::DailySales => &[col::ORDER_DATE, col::PRODUCT_CATEGORY, col::SALE_INBOUND_CHANNEL],
            Self::CampaignStatus => &[col::CAMPAIGN_ROUND, col::DB_STATUS],
            Self::Promotion => &[col::AGENT, col::PRODUCT_CATEGORY],
            Self::NewDb => &[col::AGENT, col::DB_STATUS],
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFile {
    pub kind: InputKind,
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(kind: InputKind, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            name: name.into(),
            bytes,
        }
    }

    pub fn from_path(kind: InputKind, path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { kind, name, bytes })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub variant: Variant,
    pub inputs: Vec<InputFile>,
    /// Pinned report date for the daily analysis.
    pub date: Option<NaiveDate>,
}

impl AnalysisRequest {
    pub fn new(variant: Variant, inputs: Vec<InputFile>) -> Self {
        Self {
            variant,
            inputs,
            date: None,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Result of a successful run: tables, the sheet plan and any warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub variant: Variant,
    pub tables: Vec<AggregateTable>,
    pub plan: SheetPlan,
    pub warnings: Vec<Warning>,
    /// Report date (daily analysis only).
    pub date: Option<NaiveDate>,
    /// Ranked agents (promotion analysis only).
    pub ranking: Vec<PromotionRow>,
}

impl AnalysisReport {
    pub fn table(&self, title: &str) -> Option<&AggregateTable> {
        self.tables.iter().find(|t| t.title == title)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Holds configuration read once at construction and runs analyses.
pub struct Pipeline {
    settings: PipelineSettings,
    roster: Roster,
    targets: RevenueTargets,
    promotion: PromotionSettings,
    calendar: Box<dyn BusinessCalendar>,
    clock: Box<dyn Clock>,
    config_warnings: Vec<Warning>,
    cache: ResultCache<AnalysisReport>,
}

impl Pipeline {
    /// Build from validated settings and already-loaded configuration files.
    /// Files that failed to load become warnings on every report.
    pub fn new(settings: PipelineSettings, config: LoadedConfig) -> Result<Self, PipelineError> {
        settings
            .validate()
            .map_err(|e| PipelineError::new(Stage::Config, ErrorKind::ConfigInvalid(e), ""))?;

        let config_warnings = config
            .problems
            .iter()
            .map(|p| Warning::ConfigFallback { message: p.to_string() })
            .collect();
        let cache = ResultCache::new(Duration::from_secs(settings.cache.ttl_secs), settings.cache.capacity);

        Ok(Self {
            roster: Roster::new(&config.roster, &config.excluded_managers),
            targets: config.targets,
            promotion: config.promotion,
            calendar: Box::new(WeekdayCalendar::new(settings.holidays.iter().copied())),
            clock: Box::new(SystemClock),
            config_warnings,
            cache,
            settings,
        })
    }

    /// Load settings from `path` (or the default location) and every data
    /// file it references.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let settings = match path {
            Some(p) => PipelineSettings::load(p),
            None => PipelineSettings::load_default(),
        }
        .map_err(|e| PipelineError::new(Stage::Config, ErrorKind::ConfigInvalid(e), ""))?;
        let config = LoadedConfig::load(&settings);
        Self::new(settings, config)
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self.cache.clear();
        self
    }

    pub fn with_calendar(mut self, calendar: impl BusinessCalendar + 'static) -> Self {
        self.calendar = Box::new(calendar);
        self.cache.clear();
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn targets(&self) -> &RevenueTargets {
        &self.targets
    }

    pub fn promotion(&self) -> &PromotionSettings {
        &self.promotion
    }

    pub fn config_warnings(&self) -> &[Warning] {
        &self.config_warnings
    }

    /// Run one analysis. Repeating a request within the cache TTL returns
    /// the stored report.
    pub fn run(&mut self, request: &AnalysisRequest) -> Result<AnalysisReport, PipelineError> {
        let digest = digest_inputs(request.inputs.iter().map(|f| (f.kind.as_str(), f.bytes.as_slice())));
        let key = CacheKey {
            variant: request.variant,
            digest,
            params: format!("{:?}|{}", request.date, self.clock.today()),
        };
        if let Some(report) = self.cache.get(&key) {
            return Ok(report);
        }

        let report = Run {
            pipeline: self,
            request,
            summary: summarize(&request.inputs),
            seed: sample_seed(&digest),
            warnings: self.config_warnings.clone(),
        }
        .execute()?;

        for w in &report.warnings {
            log::warn!("{}: {w}", request.variant);
        }
        self.cache.insert(key, report.clone());
        Ok(report)
    }
}

/// `contract: jan.xlsx (5120 bytes), sales: feb.xls (80 bytes)`
fn summarize(inputs: &[InputFile]) -> String {
    inputs
        .iter()
        .map(|f| format!("{}: {} ({} bytes)", f.kind, f.name, f.bytes.len()))
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// One run
// ---------------------------------------------------------------------------

struct Run<'a> {
    pipeline: &'a Pipeline,
    request: &'a AnalysisRequest,
    summary: String,
    seed: u64,
    warnings: Vec<Warning>,
}

impl Run<'_> {
    fn fail(&self, stage: Stage, kind: ErrorKind) -> PipelineError {
        PipelineError::new(stage, kind, self.summary.clone())
    }

    fn header_row(&self, kind: InputKind) -> usize {
        let rows = &self.pipeline.settings.header_rows;
        match kind {
            InputKind::Sales => rows.sales,
            InputKind::Contract => rows.contract,
            InputKind::CallTime => rows.call_time,
            InputKind::Installation => rows.installation,
        }
    }

    /// Read every input, merging files of the same kind in upload order.
    fn read_all(&self) -> Result<BTreeMap<InputKind, RawSheet>, PipelineError> {
        let mut sheets: BTreeMap<InputKind, RawSheet> = BTreeMap::new();
        for file in &self.request.inputs {
            let options = ReadOptions::with_header_row(self.header_row(file.kind));
            let output = salesdash_io::read(&file.bytes, &options).map_err(|error| {
                self.fail(
                    Stage::Read,
                    ErrorKind::ReadFailure {
                        file: file.name.clone(),
                        error,
                    },
                )
            })?;
            log::info!(
                "{}: {} rows x {} columns via {}",
                file.name,
                output.sheet.height(),
                output.sheet.width(),
                output.backend
            );
            match sheets.get_mut(&file.kind) {
                Some(existing) => existing.append(&output.sheet),
                None => {
                    sheets.insert(file.kind, output.sheet);
                }
            }
        }
        Ok(sheets)
    }

    /// Normalize; missing fatal columns fail the run, the rest warn.
    fn normalized(&mut self, raw: RawSheet, kind: InputKind, fatal: &[&str]) -> Result<NormalizedSheet, PipelineError> {
        let (sheet, missing) = normalize(raw, kind);
        if let Some(column) = fatal.iter().find(|c| missing.contains(c)) {
            return Err(self.fail(
                Stage::Normalize,
                ErrorKind::MissingRequiredColumn {
                    kind,
                    column: column.to_string(),
                },
            ));
        }
        for column in missing.iter() {
            self.warnings.push(Warning::MissingOptionalColumn {
                kind,
                column: column.to_string(),
            });
        }
        for (canonical, label) in sheet.mapping() {
            log::debug!("{kind}: {canonical} <- '{label}'");
        }
        Ok(sheet)
    }

    fn execute(mut self) -> Result<AnalysisReport, PipelineError> {
        let variant = self.request.variant;
        let mut sheets = self.read_all()?;
        let primary_kind = variant.primary_input();
        let Some(primary) = sheets.remove(&primary_kind) else {
            return Err(self.fail(Stage::Read, ErrorKind::MissingInput(primary_kind)));
        };
        let primary = self.normalized(primary, primary_kind, variant.fatal_columns())?;

        let mut report = AnalysisReport {
            variant,
            tables: Vec::new(),
            plan: SheetPlan::default(),
            warnings: Vec::new(),
            date: None,
            ranking: Vec::new(),
        };
        let mut raw = Vec::new();

        match variant {
            Variant::AgentPerformance => self.agent_performance(primary, sheets, &mut report, &mut raw),
            Variant::DailySales => self.daily_sales(primary, sheets, &mut report, &mut raw)?,
            Variant::CampaignStatus => {
                let records = self.contracts(&primary);
                let table = campaign_by_status(&records);
                if table.is_empty() {
                    self.empty("campaign rounds");
                }
                report.tables.push(table);
            }
            Variant::Promotion => {
                let records = self.sales(&primary);
                let (table, ranking) = promotion_ranking(
                    &records,
                    &self.pipeline.roster,
                    &self.match_options(),
                    &self.pipeline.promotion,
                );
                if table.is_empty() {
                    self.empty("promotion rows");
                }
                report.tables.push(table);
                report.ranking = ranking;
            }
            Variant::NewDb => {
                let records = self.contracts(&primary);
                report
                    .tables
                    .push(new_db_counts(&records, &self.pipeline.roster, &self.match_options()));
            }
        }

        report.plan = plan_sheets(variant, &report.tables, &raw, self.pipeline.settings.raw_row_cap, self.seed);
        report.warnings = self.warnings;
        Ok(report)
    }

    fn match_options(&self) -> MatchOptions {
        MatchOptions::from_settings(&self.pipeline.settings)
    }

    fn empty(&mut self, what: &str) {
        self.warnings.push(Warning::EmptyAfterFiltering { what: what.to_string() });
    }

    fn contracts(&mut self, sheet: &NormalizedSheet) -> Vec<crate::records::ContractRecord> {
        let (records, warnings) = contract_records(sheet, self.pipeline.settings.vat_rate);
        self.warnings.extend(warnings);
        records
    }

    fn sales(&mut self, sheet: &NormalizedSheet) -> Vec<SalesRecord> {
        let (records, warnings) = sales_records(sheet, self.pipeline.settings.vat_rate);
        self.warnings.extend(warnings);
        records
    }

    fn agent_performance(
        &mut self,
        contract: NormalizedSheet,
        mut sheets: BTreeMap<InputKind, RawSheet>,
        report: &mut AnalysisReport,
        raw: &mut Vec<RawSource>,
    ) {
        let records = self.contracts(&contract);
        let calls = match sheets.remove(&InputKind::CallTime) {
            Some(sheet) => call_time_records(sheet, &self.pipeline.roster.invalid_patterns).records,
            None => Vec::new(),
        };

        let matched = match_agents(&records, &calls, &self.pipeline.roster, &self.match_options());
        if matched.unmatched_calls > 0 {
            self.warnings.push(Warning::AgentMatchMiss {
                count: matched.unmatched_calls,
            });
        }
        if matched.matched_rows.is_empty() {
            self.empty("contract rows by agent, sale channel and campaign");
        }

        report.tables.push(per_agent_performance(&matched.rollups));
        let source_rows: Vec<usize> = matched.matched_rows.iter().map(|&i| records[i].row).collect();
        raw.push(RawSource {
            sheet_name: FILTERED_RAW_SHEET,
            sheet: contract.sheet.select_rows(&source_rows),
            drop_empty_columns: false,
        });
    }

    fn daily_sales(
        &mut self,
        sales: NormalizedSheet,
        mut sheets: BTreeMap<InputKind, RawSheet>,
        report: &mut AnalysisReport,
        raw: &mut Vec<RawSource>,
    ) -> Result<(), PipelineError> {
        let records = self.sales(&sales);
        let installation = match sheets.remove(&InputKind::Installation) {
            Some(sheet) => {
                let norm = self.normalized(sheet, InputKind::Installation, &[])?;
                Some(norm)
            }
            None => None,
        };
        let installed_records = match &installation {
            Some(norm) => self.sales(norm),
            None => Vec::new(),
        };

        let date = choose_report_date(
            self.request.date,
            records.iter().filter_map(|r| r.contract.order_day()),
            self.pipeline.calendar.as_ref(),
            self.pipeline.clock.as_ref(),
        );
        log::info!("daily sales report for {date}");

        let order = product_display_order(&self.pipeline.settings.product_order);
        let on_day: Vec<&SalesRecord> = records.iter().filter(|r| r.contract.order_day() == Some(date)).collect();
        let month_to_date: Vec<&SalesRecord> = records
            .iter()
            .filter(|r| {
                r.contract
                    .order_day()
                    .is_some_and(|d| d.year() == date.year() && d.month() == date.month() && d <= date)
            })
            .collect();
        let installed: Vec<&SalesRecord> = installed_records
            .iter()
            .filter(|r| r.installation_day() == Some(date))
            .collect();
        if on_day.is_empty() {
            self.empty(&format!("sales rows dated {date}"));
        }

        let (daily, _) = daily_product_rollup(&format!("{date} 일일 승인 실적"), &on_day, &order);
        let (cumulative, totals) =
            daily_product_rollup(&format!("{}월 누적 승인 실적", date.month()), &month_to_date, &order);
        let (installed_table, _) = daily_product_rollup(&format!("{date} 설치 실적"), &installed, &order);
        let target = self.pipeline.targets.for_month(date.month());
        let achievement = target_achievement(&format!("{}월 목표 달성률", date.month()), &target, &totals);

        report.tables.extend([daily, cumulative, installed_table, achievement]);
        report.date = Some(date);

        raw.push(RawSource {
            sheet_name: APPROVED_RAW_SHEET,
            sheet: sales.sheet,
            drop_empty_columns: true,
        });
        if let Some(norm) = installation {
            raw.push(RawSource {
                sheet_name: INSTALLED_RAW_SHEET,
                sheet: norm.sheet,
                drop_empty_columns: true,
            });
        }
        Ok(())
    }
}
