// Agent registry: the roster of agents by team plus excluded accounts

use std::fmt;

use salesdash_config::RosterFile;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Crm,
    Online,
}

impl Team {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Crm => "CRM팀",
            Self::Online => "온라인팀",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crm => write!(f, "crm"),
            Self::Online => write!(f, "online"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentProfile {
    pub name: String,
    pub team: Team,
    pub excluded: bool,
}

/// Names are kept verbatim; every comparison uses the trimmed form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    pub crm: Vec<String>,
    pub online: Vec<String>,
    pub excluded_managers: Vec<String>,
    /// Call-time rows whose agent contains one of these are not agents.
    pub invalid_patterns: Vec<String>,
}

impl Roster {
    pub fn new(file: &RosterFile, excluded_managers: &[String]) -> Self {
        Self {
            crm: file.crm.clone(),
            online: file.online.clone(),
            excluded_managers: excluded_managers.to_vec(),
            invalid_patterns: file.invalid_patterns.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.crm.is_empty() && self.online.is_empty()
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        let name = name.trim();
        self.excluded_managers.iter().any(|m| m.trim() == name)
    }

    /// Team of a rostered agent. Online membership wins over CRM; excluded
    /// managers have no team.
    pub fn team_of(&self, name: &str) -> Option<Team> {
        let name = name.trim();
        if name.is_empty() || self.is_excluded(name) {
            return None;
        }
        if self.online.iter().any(|n| n.trim() == name) {
            Some(Team::Online)
        } else if self.crm.iter().any(|n| n.trim() == name) {
            Some(Team::Crm)
        } else {
            None
        }
    }

    /// Union of both teams, trimmed, deduplicated and sorted.
    pub fn all_agents(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .crm
            .iter()
            .chain(self.online.iter())
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Every rostered agent with its team, excluded managers included and
    /// flagged.
    pub fn profiles(&self) -> Vec<AgentProfile> {
        self.all_agents()
            .into_iter()
            .map(|name| {
                let excluded = self.is_excluded(&name);
                let team = if self.online.iter().any(|n| n.trim() == name) {
                    Team::Online
                } else {
                    Team::Crm
                };
                AgentProfile { name, team, excluded }
            })
            .collect()
    }

    /// Agents that appear in per-agent outputs.
    pub fn active_profiles(&self) -> Vec<AgentProfile> {
        self.profiles().into_iter().filter(|p| !p.excluded).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster {
            crm: vec!["김부자 ".into(), "이영희".into(), "최팀장".into()],
            online: vec!["박철수".into()],
            excluded_managers: vec!["최팀장".into()],
            invalid_patterns: Vec::new(),
        }
    }

    #[test]
    fn comparisons_are_trimmed() {
        let r = roster();
        assert_eq!(r.team_of("김부자"), Some(Team::Crm));
        assert_eq!(r.team_of(" 박철수 "), Some(Team::Online));
        assert_eq!(r.team_of("없는사람"), None);
        assert_eq!(r.crm[0], "김부자 ");
    }

    #[test]
    fn excluded_managers_have_no_team() {
        let r = roster();
        assert!(r.is_excluded("최팀장 "));
        assert_eq!(r.team_of("최팀장"), None);
        let active: Vec<String> = r.active_profiles().into_iter().map(|p| p.name).collect();
        assert_eq!(active, vec!["김부자", "박철수", "이영희"]);
    }

    #[test]
    fn all_agents_sorted_union() {
        assert_eq!(roster().all_agents(), vec!["김부자", "박철수", "이영희", "최팀장"]);
    }

    #[test]
    fn from_roster_file() {
        let file = RosterFile::from_json(r#"{"CRM팀": ["a"], "온라인팀": ["b"]}"#).unwrap();
        let r = Roster::new(&file, &["c".to_string()]);
        assert_eq!(r.team_of("b"), Some(Team::Online));
        assert!(r.is_excluded("c"));
        assert!(!r.invalid_patterns.is_empty());
    }
}
