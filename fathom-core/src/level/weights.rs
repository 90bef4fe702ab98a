//! Electrode weight table
//!
//! Electrodes sit on a vertical strip at a fixed pitch. The end electrodes
//! only see half a pitch of liquid before the next one takes over, so they
//! count once; every interior electrode counts twice. Summing the weights of
//! the submerged electrodes gives the level in half-pitch units.

/// Per-electrode contribution to the submerged weight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ElectrodeWeights<const N: usize>([u8; N]);

impl<const N: usize> ElectrodeWeights<N> {
    /// Use an explicit table
    pub const fn new(table: [u8; N]) -> Self {
        Self(table)
    }

    /// Uniform pitch: 1 at both ends, 2 in between
    pub const fn uniform() -> Self {
        let mut table = [2u8; N];
        if N > 0 {
            table[0] = 1;
            table[N - 1] = 1;
        }
        Self(table)
    }

    /// Weight of electrode `index`, 0 when out of range
    pub fn get(&self, index: usize) -> u8 {
        self.0.get(index).copied().unwrap_or(0)
    }

    /// Sum of all weights
    pub fn total(&self) -> u32 {
        self.0.iter().map(|&w| w as u32).sum()
    }

    pub const fn as_array(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> Default for ElectrodeWeights<N> {
    fn default() -> Self {
        Self::uniform()
    }
}
