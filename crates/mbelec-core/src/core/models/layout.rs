use super::topology::{MonomerTopology, TopologyError};

/// Permutation between system order and site-major order.
///
/// Site-major order walks the monomer types in `mon_type_count` order; within a type, site
/// `s` of every monomer of that type (in order of occurrence) precedes site `s + 1`.
/// Vector quantities in site-major order are stored component-major, so the `c`-th
/// component of slot `k` lives at `c * num_sites + k`.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteLayout {
    system_index: Vec<usize>,
    slot_of: Vec<usize>,
    slot_monomer: Vec<usize>,
}

impl SiteLayout {
    pub fn new(topology: &MonomerTopology) -> Result<Self, TopologyError> {
        topology.validate()?;

        let total = topology.num_sites();
        let mut system_index = Vec::with_capacity(total);
        let mut slot_monomer = Vec::with_capacity(total);

        for (type_name, _) in &topology.mon_type_count {
            let members: Vec<usize> = topology
                .monomer_ids
                .iter()
                .enumerate()
                .filter(|(_, id)| *id == type_name)
                .map(|(m, _)| m)
                .collect();
            let Some(&leader) = members.first() else {
                continue;
            };
            for site in 0..topology.site_counts[leader] {
                for &m in &members {
                    system_index.push(topology.first_indices[m] + site);
                    slot_monomer.push(m);
                }
            }
        }

        let mut slot_of = vec![0; total];
        for (slot, &sys) in system_index.iter().enumerate() {
            slot_of[sys] = slot;
        }

        Ok(Self {
            system_index,
            slot_of,
            slot_monomer,
        })
    }

    #[inline]
    pub fn num_sites(&self) -> usize {
        self.system_index.len()
    }

    /// System-order site index stored at site-major slot `slot`.
    #[inline]
    pub fn system_site(&self, slot: usize) -> usize {
        self.system_index[slot]
    }

    /// Site-major slot holding system-order site `site`.
    #[inline]
    pub fn slot(&self, site: usize) -> usize {
        self.slot_of[site]
    }

    /// Index (system monomer order) of the monomer owning `slot`.
    #[inline]
    pub fn slot_monomer(&self, slot: usize) -> usize {
        self.slot_monomer[slot]
    }

    #[inline]
    pub fn slot_monomers(&self) -> &[usize] {
        &self.slot_monomer
    }

    fn check_len(
        &self,
        field: &'static str,
        len: usize,
        components: usize,
    ) -> Result<(), TopologyError> {
        let expected = self.num_sites() * components;
        if len != expected {
            return Err(TopologyError::LengthMismatch {
                field,
                expected,
                found: len,
            });
        }
        Ok(())
    }

    /// Permutes an interleaved system-order vector into component-major site-major order.
    pub fn reorder(&self, system: &[f64], components: usize) -> Result<Vec<f64>, TopologyError> {
        self.check_len("system vector", system.len(), components)?;
        let n = self.num_sites();
        let mut out = vec![0.0; n * components];
        for (slot, &sys) in self.system_index.iter().enumerate() {
            for c in 0..components {
                out[c * n + slot] = system[sys * components + c];
            }
        }
        Ok(out)
    }

    /// Inverse of [`SiteLayout::reorder`].
    pub fn unreorder(
        &self,
        site_major: &[f64],
        components: usize,
    ) -> Result<Vec<f64>, TopologyError> {
        let mut out = vec![0.0; site_major.len()];
        self.unreorder_add(site_major, components, &mut out)?;
        Ok(out)
    }

    /// Scatters a site-major vector back to system order, adding into `system`.
    pub fn unreorder_add(
        &self,
        site_major: &[f64],
        components: usize,
        system: &mut [f64],
    ) -> Result<(), TopologyError> {
        self.check_len("site-major vector", site_major.len(), components)?;
        self.check_len("system vector", system.len(), components)?;
        let n = self.num_sites();
        for (slot, &sys) in self.system_index.iter().enumerate() {
            for c in 0..components {
                system[sys * components + c] += site_major[c * n + slot];
            }
        }
        Ok(())
    }
}
