// Agent matching: join contract and call-time rows to rostered agents
//
// A source name resolves to a rostered agent by trimmed equality first.
// Failing that, containment is tried in both directions: the source name
// containing the rostered name ("김부자(주임)"), or the rostered name
// containing a source name of at least two characters ("김부자1" vs
// "김부자"). When several agents qualify, the longest rostered name wins;
// equally long names fall back to roster order and are logged.

use std::collections::BTreeMap;

use salesdash_config::PipelineSettings;
use serde::Serialize;

use crate::classify::{ClassMasks, ProductClass};
use crate::coerce::format_duration;
use crate::records::{CallTimeRecord, ContractRecord};
use crate::registry::{Roster, Team};

/// Shortest source name accepted for reverse containment.
const MIN_REVERSE_MATCH_CHARS: usize = 2;

/// True when a source-system name refers to the rostered agent.
pub fn names_match(rostered: &str, source: &str) -> bool {
    let rostered = rostered.trim();
    let source = source.trim();
    if rostered.is_empty() || source.is_empty() {
        return false;
    }
    rostered == source
        || source.contains(rostered)
        || (source.chars().count() >= MIN_REVERSE_MATCH_CHARS && rostered.contains(source))
}

/// Resolves source names to positions in a fixed list of rostered names.
#[derive(Debug, Clone)]
pub struct AgentIndex {
    names: Vec<String>,
}

impl AgentIndex {
    pub fn new<I: IntoIterator<Item = String>>(names: I) -> Self {
        Self {
            names: names.into_iter().map(|n| n.trim().to_string()).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn resolve(&self, source: &str) -> Option<usize> {
        let source = source.trim();
        if source.is_empty() {
            return None;
        }
        if let Some(i) = self.names.iter().position(|n| n == source) {
            return Some(i);
        }
        let candidates = self.candidates(source);
        if let [first, second, ..] = candidates.as_slice() {
            if self.len_of(*first) == self.len_of(*second) {
                log::debug!(
                    "'{source}' is ambiguous between '{}' and '{}'; using '{}'",
                    self.names[*first],
                    self.names[*second],
                    self.names[*first]
                );
            }
        }
        candidates.first().copied()
    }

    /// Every rostered position that contains or is contained by `source`,
    /// best first: longest name, then roster order.
    pub fn candidates(&self, source: &str) -> Vec<usize> {
        let mut hits: Vec<usize> = (0..self.names.len())
            .filter(|&i| names_match(&self.names[i], source))
            .collect();
        hits.sort_by(|&a, &b| self.len_of(b).cmp(&self.len_of(a)).then(a.cmp(&b)));
        hits
    }

    /// True when two or more equally specific agents qualify for `source`.
    pub fn is_ambiguous(&self, source: &str) -> bool {
        let source = source.trim();
        if self.names.iter().any(|n| n == source) {
            return false;
        }
        match self.candidates(source).as_slice() {
            [first, second, ..] => self.len_of(*first) == self.len_of(*second),
            _ => false,
        }
    }

    fn len_of(&self, i: usize) -> usize {
        self.names[i].chars().count()
    }
}

// ---------------------------------------------------------------------------
// Rollups
// ---------------------------------------------------------------------------

/// Counts and revenues per product class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProductTally {
    pub counts: [u64; 6],
    pub gross: [f64; 6],
    pub ex_vat: [f64; 6],
}

impl ProductTally {
    pub fn add(&mut self, product: ProductClass, gross: f64, ex_vat: f64) {
        let i = product.index();
        self.counts[i] += 1;
        self.gross[i] += gross;
        self.ex_vat[i] += ex_vat;
    }

    pub fn count(&self, product: ProductClass) -> u64 {
        self.counts[product.index()]
    }

    pub fn total_count(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn total_gross(&self) -> f64 {
        self.gross.iter().sum()
    }

    pub fn total_ex_vat(&self) -> f64 {
        self.ex_vat.iter().sum()
    }

    pub fn merge(&mut self, other: &ProductTally) {
        for i in 0..self.counts.len() {
            self.counts[i] += other.counts[i];
            self.gross[i] += other.gross[i];
            self.ex_vat[i] += other.ex_vat[i];
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentRollup {
    pub name: String,
    pub team: Team,
    /// False for agents kept only because unregistered agents were allowed.
    pub registered: bool,
    pub tally: ProductTally,
    pub call_count: u64,
    pub call_time_seconds: u64,
    pub call_time_display: String,
}

impl AgentRollup {
    fn new(name: String, team: Team, registered: bool) -> Self {
        Self {
            name,
            team,
            registered,
            tally: ProductTally::default(),
            call_count: 0,
            call_time_seconds: 0,
            call_time_display: format_duration(0),
        }
    }

    pub fn total_count(&self) -> u64 {
        self.tally.total_count()
    }

    /// VAT-excluded revenue over all products.
    pub fn total_revenue(&self) -> f64 {
        self.tally.total_ex_vat()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOptions {
    /// Drop contract agents that are not on the roster.
    pub registered_only: bool,
    /// Allowed `sale_channel` values; empty allows all.
    pub sale_channels: Vec<String>,
    /// Require a campaign round that is online or HQ/affiliate.
    pub require_campaign: bool,
    /// Shared logins never attributed to anyone.
    pub excluded_accounts: Vec<String>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self::from_settings(&PipelineSettings::default())
    }
}

impl MatchOptions {
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            registered_only: settings.registered_only,
            sale_channels: settings.contract_filter.sale_channels.clone(),
            require_campaign: settings.contract_filter.require_campaign,
            excluded_accounts: settings.excluded_accounts.clone(),
        }
    }

    fn is_excluded_account(&self, name: &str) -> bool {
        let name = name.trim();
        self.excluded_accounts.iter().any(|a| a.trim() == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutput {
    /// Rostered agents in roster order, then unregistered agents by name.
    pub rollups: Vec<AgentRollup>,
    /// Indices into the contract slice of rows that were attributed and
    /// passed the record filters, ascending.
    pub matched_rows: Vec<usize>,
    /// Call-time rows that matched no agent.
    pub unmatched_calls: usize,
}

/// Attribute contract and call-time rows to agents and tally per product.
///
/// Record filters run after attribution, so a row that matches an agent but
/// fails the channel filter is simply not counted.
pub fn match_agents(
    contracts: &[ContractRecord],
    calls: &[CallTimeRecord],
    roster: &Roster,
    options: &MatchOptions,
) -> MatchOutput {
    let profiles = roster.active_profiles();
    let index = AgentIndex::new(profiles.iter().map(|p| p.name.clone()));
    let mut rollups: Vec<AgentRollup> = profiles
        .into_iter()
        .map(|p| AgentRollup::new(p.name, p.team, true))
        .collect();
    let mut unregistered: BTreeMap<String, AgentRollup> = BTreeMap::new();

    let masks = ClassMasks::build(contracts);
    let mut matched_rows = Vec::new();

    for (i, record) in contracts.iter().enumerate() {
        let name = record.agent.trim();
        if name.is_empty() || options.is_excluded_account(name) || roster.is_excluded(name) {
            continue;
        }
        let rollup = match index.resolve(name) {
            Some(pos) => &mut rollups[pos],
            None if !options.registered_only => unregistered
                .entry(name.to_string())
                .or_insert_with(|| AgentRollup::new(name.to_string(), Team::Crm, false)),
            None => continue,
        };
        if !passes_filters(record, &masks, i, options) {
            continue;
        }
        rollup
            .tally
            .add(masks.product(i), record.revenue_gross, record.revenue_ex_vat);
        matched_rows.push(i);
    }

    let mut unmatched_calls = 0;
    for call in calls {
        let name = call.agent.trim();
        if options.is_excluded_account(name) || roster.is_excluded(name) {
            continue;
        }
        let rollup = match index.resolve(name) {
            Some(pos) => Some(&mut rollups[pos]),
            None => unregistered.get_mut(name),
        };
        match rollup {
            Some(r) => {
                r.call_count = r.call_count.saturating_add(call.call_count);
                r.call_time_seconds = r.call_time_seconds.saturating_add(call.call_time_seconds);
                r.call_time_display = format_duration(r.call_time_seconds);
            }
            None => {
                log::debug!("call-time row for '{name}' matched no agent");
                unmatched_calls += 1;
            }
        }
    }

    rollups.extend(unregistered.into_values());
    log::debug!(
        "matched {} contract rows to {} agents; {} call rows unmatched",
        matched_rows.len(),
        rollups.len(),
        unmatched_calls
    );

    MatchOutput {
        rollups,
        matched_rows,
        unmatched_calls,
    }
}

fn passes_filters(record: &ContractRecord, masks: &ClassMasks, i: usize, options: &MatchOptions) -> bool {
    if !options.sale_channels.is_empty() {
        let channel = record.sale_channel.trim();
        if !options.sale_channels.iter().any(|c| c.trim() == channel) {
            return false;
        }
    }
    if options.require_campaign {
        let has_round = !record.campaign_round.trim().is_empty();
        if !has_round || !(masks.online_round[i] || masks.hq_or_affiliate[i]) {
            return false;
        }
    }
    true
}
