// Row classification: product, sales channel and campaign kind
//
// The per-row functions define the rules. `ClassMasks` evaluates the same
// rules column-wise: each keyword test is computed once over all rows and
// the masks are then composed in rule order.

use std::fmt;

use serde::Serialize;

use crate::records::RowFields;

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductClass {
    Chair,
    Mattress,
    Water,
    CareService,
    Membership,
    Other,
}

impl ProductClass {
    pub const ALL: [ProductClass; 6] = [
        Self::Chair,
        Self::Mattress,
        Self::Water,
        Self::CareService,
        Self::Membership,
        Self::Other,
    ];

    /// Physical products shown in the daily rollup.
    pub const GOODS: [ProductClass; 3] = [Self::Chair, Self::Mattress, Self::Water];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Chair => "chair",
            Self::Mattress => "mattress",
            Self::Water => "water",
            Self::CareService => "care_service",
            Self::Membership => "membership",
            Self::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Chair => "안마의자",
            Self::Mattress => "라클라우드",
            Self::Water => "정수기",
            Self::CareService => "케어서비스",
            Self::Membership => "멤버십",
            Self::Other => "기타",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }

    pub fn is_service(&self) -> bool {
        matches!(self, Self::CareService | Self::Membership)
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ProductClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Direct,
    Affiliate,
    Online,
    Unknown,
}

impl Channel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Direct => "본사",
            Self::Affiliate => "연계",
            Self::Online => "온라인",
            Self::Unknown => "미분류",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Affiliate => write!(f, "affiliate"),
            Self::Online => write!(f, "online"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignKind {
    Campaign,
    Regular,
    Redistribution,
    OnlineBatch,
    Other,
}

impl CampaignKind {
    pub const ALL: [CampaignKind; 5] = [
        Self::Campaign,
        Self::Regular,
        Self::Redistribution,
        Self::OnlineBatch,
        Self::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Campaign => "캠페인",
            Self::Regular => "정규",
            Self::Redistribution => "재분배",
            Self::OnlineBatch => "온라인",
            Self::Other => "기타",
        }
    }

    /// Row order in the campaign pivot.
    pub fn sort_rank(&self) -> u8 {
        match self {
            Self::Campaign => 0,
            Self::Regular => 1,
            Self::Redistribution => 2,
            Self::OnlineBatch | Self::Other => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub product: ProductClass,
    pub channel: Channel,
    pub campaign_kind: CampaignKind,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

const ONLINE_PREFIX: &str = "CB-";

fn has_care(sale_type: &str) -> bool {
    sale_type.contains("케어")
}

fn has_membership(sale_type: &str) -> bool {
    sale_type.contains("멤버십") || sale_type.contains("멤버쉽")
}

fn category_has(category: &str, keyword: &str) -> bool {
    category.to_lowercase().contains(keyword)
}

fn is_online_round(round: &str) -> bool {
    round.trim().starts_with(ONLINE_PREFIX)
}

fn is_crm_inbound(inbound: &str) -> bool {
    inbound.contains("CRM")
}

/// First matching rule wins: service types, then product keywords.
pub fn classify_product(sale_type: &str, product_category: &str) -> ProductClass {
    if has_care(sale_type) {
        ProductClass::CareService
    } else if has_membership(sale_type) {
        ProductClass::Membership
    } else if category_has(product_category, "안마의자") {
        ProductClass::Chair
    } else if category_has(product_category, "라클라우드") {
        ProductClass::Mattress
    } else if category_has(product_category, "정수기") {
        ProductClass::Water
    } else {
        ProductClass::Other
    }
}

/// Headquarters-or-affiliate approval: not an online round, and either a
/// `V-`/`C-` round or one naming a campaign, regular or redistribution wave.
pub fn is_hq_or_affiliate(campaign_round: &str) -> bool {
    let round = campaign_round.trim();
    !round.starts_with(ONLINE_PREFIX)
        && (round.starts_with("V-")
            || round.starts_with("C-")
            || ["캠", "정규", "분배"].iter().any(|k| round.contains(k)))
}

pub fn classify_channel(campaign_round: &str, sale_inbound_channel: &str) -> Channel {
    if is_online_round(campaign_round) {
        Channel::Online
    } else if !is_hq_or_affiliate(campaign_round) {
        Channel::Unknown
    } else if is_crm_inbound(sale_inbound_channel) {
        Channel::Direct
    } else {
        Channel::Affiliate
    }
}

pub fn classify_campaign(campaign_round: &str) -> CampaignKind {
    let round = campaign_round.trim();
    if round.contains('캠') {
        CampaignKind::Campaign
    } else if round.contains("정규") {
        CampaignKind::Regular
    } else if round.contains("재분배") {
        CampaignKind::Redistribution
    } else if round.starts_with(ONLINE_PREFIX) {
        CampaignKind::OnlineBatch
    } else {
        CampaignKind::Other
    }
}

pub fn classify<R: RowFields>(row: &R) -> Classification {
    Classification {
        product: classify_product(row.sale_type(), row.product_category()),
        channel: classify_channel(row.campaign_round(), row.sale_inbound_channel()),
        campaign_kind: classify_campaign(row.campaign_round()),
    }
}

// ---------------------------------------------------------------------------
// Column-wise masks
// ---------------------------------------------------------------------------

/// Keyword masks over a slice of rows, plus the classes composed from them.
#[derive(Debug, Clone, Default)]
pub struct ClassMasks {
    pub care: Vec<bool>,
    pub membership: Vec<bool>,
    pub chair_keyword: Vec<bool>,
    pub mattress_keyword: Vec<bool>,
    pub water_keyword: Vec<bool>,
    pub online_round: Vec<bool>,
    pub crm_inbound: Vec<bool>,
    pub hq_or_affiliate: Vec<bool>,
    products: Vec<ProductClass>,
    channels: Vec<Channel>,
    campaigns: Vec<CampaignKind>,
}

fn mask<R, F: Fn(&R) -> bool>(rows: &[R], f: F) -> Vec<bool> {
    rows.iter().map(f).collect()
}

impl ClassMasks {
    pub fn build<R: RowFields>(rows: &[R]) -> Self {
        let care = mask(rows, |r| has_care(r.sale_type()));
        let membership = mask(rows, |r| has_membership(r.sale_type()));
        let chair_keyword = mask(rows, |r| category_has(r.product_category(), "안마의자"));
        let mattress_keyword = mask(rows, |r| category_has(r.product_category(), "라클라우드"));
        let water_keyword = mask(rows, |r| category_has(r.product_category(), "정수기"));
        let online_round = mask(rows, |r| is_online_round(r.campaign_round()));
        let crm_inbound = mask(rows, |r| is_crm_inbound(r.sale_inbound_channel()));
        let hq_or_affiliate = mask(rows, |r| is_hq_or_affiliate(r.campaign_round()));

        let products = (0..rows.len())
            .map(|i| {
                if care[i] {
                    ProductClass::CareService
                } else if membership[i] {
                    ProductClass::Membership
                } else if chair_keyword[i] {
                    ProductClass::Chair
                } else if mattress_keyword[i] {
                    ProductClass::Mattress
                } else if water_keyword[i] {
                    ProductClass::Water
                } else {
                    ProductClass::Other
                }
            })
            .collect();

        let channels = (0..rows.len())
            .map(|i| {
                if online_round[i] {
                    Channel::Online
                } else if !hq_or_affiliate[i] {
                    Channel::Unknown
                } else if crm_inbound[i] {
                    Channel::Direct
                } else {
                    Channel::Affiliate
                }
            })
            .collect();

        let campaigns = rows.iter().map(|r| classify_campaign(r.campaign_round())).collect();

        Self {
            care,
            membership,
            chair_keyword,
            mattress_keyword,
            water_keyword,
            online_round,
            crm_inbound,
            hq_or_affiliate,
            products,
            channels,
            campaigns,
        }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn product(&self, i: usize) -> ProductClass {
        self.products[i]
    }

    pub fn channel(&self, i: usize) -> Channel {
        self.channels[i]
    }

    pub fn campaign(&self, i: usize) -> CampaignKind {
        self.campaigns[i]
    }

    pub fn classification(&self, i: usize) -> Classification {
        Classification {
            product: self.products[i],
            channel: self.channels[i],
            campaign_kind: self.campaigns[i],
        }
    }

    pub fn product_mask(&self, product: ProductClass) -> Vec<bool> {
        self.products.iter().map(|p| *p == product).collect()
    }

    pub fn channel_mask(&self, channel: Channel) -> Vec<bool> {
        self.channels.iter().map(|c| *c == channel).collect()
    }
}
