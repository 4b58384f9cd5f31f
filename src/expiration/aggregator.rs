// Expiration Aggregator - one notice per domain cluster
//
// A recipient's certificates are partitioned into clusters of certificates
// connected through shared (normalized) DNS names. Renewals of the same names,
// and certificates that add or drop a name across renewals, end up together.
// Each cluster is reported once, through its earliest-expiring member.

use crate::Result;
use crate::certificates::names::{NameDigest, normalize_name, normalize_names};
use crate::certificates::Certificate;
use crate::expiration::template::{EXPIRATION_FORMAT, NoticeContext, NoticeTemplate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Rendered notice for one domain cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationNotice {
    /// Serial of the earliest-expiring member
    pub serial: String,
    /// Every member of the cluster
    pub member_serials: Vec<String>,
    /// Union of member names, normalized and sorted
    pub domains: Vec<String>,
    pub days_until_expiry: i64,
    pub expires: DateTime<Utc>,
    pub subject: String,
    pub body: String,
}

/// Certificates sharing names, earliest expiration first
#[derive(Debug, Clone)]
pub struct DomainCluster<'a> {
    members: Vec<&'a Certificate>,
}

impl<'a> DomainCluster<'a> {
    /// Earliest-expiring member; ties go to the smallest serial
    pub fn representative(&self) -> &'a Certificate {
        self.members[0]
    }

    pub fn members(&self) -> &[&'a Certificate] {
        &self.members
    }

    /// Normalized union of all members' DNS names
    pub fn domains(&self) -> Vec<String> {
        normalize_names(self.members.iter().flat_map(|c| c.dns_names.iter()))
    }
}

/// Order certificates by expiration, then numerically by hex serial
pub fn expiry_order(a: &Certificate, b: &Certificate) -> Ordering {
    a.expires
        .cmp(&b.expires)
        .then_with(|| serial_order(&a.serial, &b.serial))
}

fn serial_order(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0').to_ascii_lowercase();
    let b = b.trim_start_matches('0').to_ascii_lowercase();
    a.len().cmp(&b.len()).then_with(|| a.cmp(&b))
}

/// Union-find over certificate indexes
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

/// Groups certificates and renders notices
#[derive(Default)]
pub struct ExpirationAggregator {
    template: NoticeTemplate,
}

impl ExpirationAggregator {
    pub fn new(template: NoticeTemplate) -> Self {
        Self { template }
    }

    /// Partition certificates into domain clusters.
    ///
    /// Every input certificate lands in exactly one cluster. Clusters are ordered
    /// by their representative's expiration.
    pub fn clusters(certificates: &[Certificate]) -> Vec<DomainCluster<'_>> {
        let mut sets = DisjointSet::new(certificates.len());
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut by_digest: HashMap<NameDigest, usize> = HashMap::new();

        for (idx, cert) in certificates.iter().enumerate() {
            // identical name sets, including the empty one
            let first = *by_digest.entry(cert.name_digest()).or_insert(idx);
            sets.union(first, idx);

            for name in &cert.dns_names {
                let first = *by_name.entry(normalize_name(name)).or_insert(idx);
                sets.union(first, idx);
            }
        }

        let mut groups: BTreeMap<usize, Vec<&Certificate>> = BTreeMap::new();
        for (idx, cert) in certificates.iter().enumerate() {
            groups.entry(sets.find(idx)).or_default().push(cert);
        }

        let mut clusters: Vec<DomainCluster<'_>> = groups
            .into_values()
            .map(|mut members| {
                members.sort_by(|a, b| expiry_order(a, b));
                DomainCluster { members }
            })
            .collect();
        clusters.sort_by(|a, b| expiry_order(a.representative(), b.representative()));
        clusters
    }

    /// Render one notice per cluster, relative to `now`
    pub fn digest(
        &self,
        certificates: &[Certificate],
        now: DateTime<Utc>,
    ) -> Result<Vec<ExpirationNotice>> {
        Self::clusters(certificates)
            .iter()
            .map(|cluster| self.notice(cluster, now))
            .collect()
    }

    fn notice(&self, cluster: &DomainCluster<'_>, now: DateTime<Utc>) -> Result<ExpirationNotice> {
        let representative = cluster.representative();
        let domains = cluster.domains();
        let days_until_expiry = (representative.expires - now).num_days().max(0);

        let body = self.template.render(&NoticeContext {
            domains: domains.join("\n"),
            days: days_until_expiry,
            expiration: representative.expires.format(EXPIRATION_FORMAT).to_string(),
            serial: &representative.serial,
        })?;

        Ok(ExpirationNotice {
            serial: representative.serial.clone(),
            member_serials: cluster.members().iter().map(|c| c.serial.clone()).collect(),
            domains,
            days_until_expiry,
            expires: representative.expires,
            subject: self.template.subject().to_string(),
            body,
        })
    }
}
