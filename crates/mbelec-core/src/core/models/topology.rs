use std::collections::HashMap;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Length mismatch for '{field}': expected {expected}, found {found}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Monomer type '{0}' is not declared in the monomer type counts")]
    UnknownMonomerType(String),
    #[error("Monomer type '{0}' is declared more than once")]
    DuplicateMonomerType(String),
    #[error("Monomer type '{monomer_type}' declares {declared} monomers but {found} were found")]
    TypeCountMismatch {
        monomer_type: String,
        declared: usize,
        found: usize,
    },
    #[error(
        "Monomers of type '{monomer_type}' must share a site count: expected {expected}, found {found}"
    )]
    InconsistentSiteCount {
        monomer_type: String,
        expected: usize,
        found: usize,
    },
    #[error("Monomer {monomer} spans sites {first}..{end}, beyond the {total} sites of the system")]
    SiteOutOfRange {
        monomer: usize,
        first: usize,
        end: usize,
        total: usize,
    },
    #[error("Site {site} is claimed by more than one monomer")]
    OverlappingSite { site: usize },
}

/// Monomer-level description of a system, as supplied by the topology provider.
///
/// Monomers are listed in system order. `first_indices[m]` is the system-order index of
/// the first site of monomer `m`, and `site_counts[m]` the number of sites it owns.
/// `mon_type_count` lists every monomer type once, in the order that defines the
/// site-major layout used by the pairwise kernels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonomerTopology {
    pub monomer_ids: Vec<String>,
    pub site_counts: Vec<usize>,
    pub first_indices: Vec<usize>,
    pub mon_type_count: Vec<(String, usize)>,
}

impl MonomerTopology {
    pub fn new(
        monomer_ids: Vec<String>,
        site_counts: Vec<usize>,
        first_indices: Vec<usize>,
        mon_type_count: Vec<(String, usize)>,
    ) -> Self {
        Self {
            monomer_ids,
            site_counts,
            first_indices,
            mon_type_count,
        }
    }

    #[inline]
    pub fn num_monomers(&self) -> usize {
        self.monomer_ids.len()
    }

    #[inline]
    pub fn num_sites(&self) -> usize {
        self.site_counts.iter().sum()
    }

    /// System-order site range owned by monomer `m`.
    #[inline]
    pub fn monomer_sites(&self, m: usize) -> Range<usize> {
        self.first_indices[m]..self.first_indices[m] + self.site_counts[m]
    }

    /// Length of a charge-gradient vector: one `n × n × 3` block per monomer.
    pub fn charge_gradient_len(&self) -> usize {
        self.site_counts.iter().map(|&n| n * n * 3).sum()
    }

    /// Offset of each monomer's block inside a charge-gradient vector.
    pub fn charge_gradient_offsets(&self) -> Vec<usize> {
        let mut offset = 0;
        self.site_counts
            .iter()
            .map(|&n| {
                let start = offset;
                offset += n * n * 3;
                start
            })
            .collect()
    }

    /// Checks that the monomer lists describe a bijection onto `0..num_sites()`.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let num_monomers = self.monomer_ids.len();
        if self.site_counts.len() != num_monomers {
            return Err(TopologyError::LengthMismatch {
                field: "site_counts",
                expected: num_monomers,
                found: self.site_counts.len(),
            });
        }
        if self.first_indices.len() != num_monomers {
            return Err(TopologyError::LengthMismatch {
                field: "first_indices",
                expected: num_monomers,
                found: self.first_indices.len(),
            });
        }

        let declared_total: usize = self.mon_type_count.iter().map(|(_, n)| n).sum();
        if declared_total != num_monomers {
            return Err(TopologyError::LengthMismatch {
                field: "monomer_ids",
                expected: declared_total,
                found: num_monomers,
            });
        }

        let mut declared: HashMap<&str, usize> = HashMap::with_capacity(self.mon_type_count.len());
        for (name, count) in &self.mon_type_count {
            if declared.insert(name.as_str(), *count).is_some() {
                return Err(TopologyError::DuplicateMonomerType(name.clone()));
            }
        }

        let mut found: HashMap<&str, usize> = HashMap::with_capacity(declared.len());
        let mut type_sites: HashMap<&str, usize> = HashMap::with_capacity(declared.len());
        for (m, id) in self.monomer_ids.iter().enumerate() {
            if !declared.contains_key(id.as_str()) {
                return Err(TopologyError::UnknownMonomerType(id.clone()));
            }
            *found.entry(id.as_str()).or_default() += 1;

            let n = self.site_counts[m];
            let expected = *type_sites.entry(id.as_str()).or_insert(n);
            if expected != n {
                return Err(TopologyError::InconsistentSiteCount {
                    monomer_type: id.clone(),
                    expected,
                    found: n,
                });
            }
        }

        for (name, count) in &self.mon_type_count {
            let actual = found.get(name.as_str()).copied().unwrap_or(0);
            if actual != *count {
                return Err(TopologyError::TypeCountMismatch {
                    monomer_type: name.clone(),
                    declared: *count,
                    found: actual,
                });
            }
        }

        let total = self.num_sites();
        let mut claimed = vec![false; total];
        for m in 0..num_monomers {
            let range = self.monomer_sites(m);
            if range.end > total {
                return Err(TopologyError::SiteOutOfRange {
                    monomer: m,
                    first: range.start,
                    end: range.end,
                    total,
                });
            }
            for site in range {
                if std::mem::replace(&mut claimed[site], true) {
                    return Err(TopologyError::OverlappingSite { site });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water_and_ion() -> MonomerTopology {
        MonomerTopology::new(
            vec!["h2o".into(), "na".into(), "h2o".into()],
            vec![4, 1, 4],
            vec![0, 4, 5],
            vec![("h2o".into(), 2), ("na".into(), 1)],
        )
    }

    #[test]
    fn valid_interleaved_topology_passes_validation() {
        let topology = water_and_ion();
        assert!(topology.validate().is_ok());
        assert_eq!(topology.num_sites(), 9);
        assert_eq!(topology.num_monomers(), 3);
        assert_eq!(topology.monomer_sites(2), 5..9);
    }

    #[test]
    fn charge_gradient_blocks_are_sized_per_monomer() {
        let topology = water_and_ion();
        assert_eq!(topology.charge_gradient_len(), 48 + 3 + 48);
        assert_eq!(topology.charge_gradient_offsets(), vec![0, 48, 51]);
    }

    #[test]
    fn mismatched_first_indices_length_is_rejected() {
        let mut topology = water_and_ion();
        topology.first_indices.pop();
        assert_eq!(
            topology.validate(),
            Err(TopologyError::LengthMismatch {
                field: "first_indices",
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn type_count_disagreeing_with_monomer_list_is_rejected() {
        let mut topology = water_and_ion();
        topology.mon_type_count = vec![("h2o".into(), 1), ("na".into(), 2)];
        assert!(matches!(
            topology.validate(),
            Err(TopologyError::TypeCountMismatch { .. })
        ));
    }

    #[test]
    fn undeclared_monomer_type_is_rejected() {
        let mut topology = water_and_ion();
        topology.monomer_ids[1] = "cl".into();
        assert_eq!(
            topology.validate(),
            Err(TopologyError::UnknownMonomerType("cl".into()))
        );
    }

    #[test]
    fn differing_site_counts_within_a_type_are_rejected() {
        let mut topology = water_and_ion();
        topology.site_counts = vec![4, 1, 3];
        topology.first_indices = vec![0, 4, 5];
        assert!(matches!(
            topology.validate(),
            Err(TopologyError::InconsistentSiteCount { .. })
        ));
    }

    #[test]
    fn overlapping_monomers_are_rejected() {
        let mut topology = water_and_ion();
        topology.first_indices = vec![0, 3, 5];
        assert_eq!(
            topology.validate(),
            Err(TopologyError::OverlappingSite { site: 3 })
        );
    }

    #[test]
    fn monomer_running_past_the_end_is_rejected() {
        let mut topology = water_and_ion();
        topology.first_indices = vec![0, 4, 6];
        assert!(matches!(
            topology.validate(),
            Err(TopologyError::SiteOutOfRange { monomer: 2, .. })
        ));
    }
}
