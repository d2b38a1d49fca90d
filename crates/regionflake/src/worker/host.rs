#[cfg(all(feature = "host", feature = "tracing"))]
use tracing::instrument;

#[cfg(feature = "host")]
use crate::Error;
use crate::{Result, generator::GeneratorConfig, worker::WorkerIdSource};

/// Region used when the host has no hardware address to derive one from.
const FALLBACK_REGION_ID: u64 = 1;

/// Worker and region IDs derived from the machine itself, for deployments
/// without a coordination store.
///
/// The region comes from the two low bytes of the hardware (MAC) address and
/// the worker from a hash of the region and the process id, so two processes
/// on one machine usually differ in worker ID. Unlike the store-backed
/// source nothing guarantees uniqueness across machines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProcessWorkerId {
    worker_id: u64,
    region_id: u64,
}

impl ProcessWorkerId {
    /// Derives the IDs from a hardware address and a process id.
    ///
    /// Without an address the region falls back to `1`.
    pub fn from_parts(mac: Option<[u8; 6]>, pid: u32) -> Self {
        let region_id = match mac {
            Some(mac) => ((u64::from(mac[4]) << 8 | u64::from(mac[5])) >> 6) % 8,
            None => FALLBACK_REGION_ID,
        };
        let hash = string_hash(&format!("{region_id}{pid}"));
        let worker_id = u64::from(hash & 0xffff) % (GeneratorConfig::MAX_WORKER_ID + 1);
        Self {
            worker_id,
            region_id,
        }
    }

    /// Reads the first hardware address of this machine and the current
    /// process id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HostDetection`] if the network interfaces cannot be
    /// listed. A machine without any hardware address is not an error.
    #[cfg(feature = "host")]
    #[cfg_attr(feature = "tracing", instrument(level = "debug"))]
    pub fn detect() -> Result<Self> {
        let mac = mac_address::get_mac_address()
            .map_err(|err| Error::HostDetection {
                reason: err.to_string(),
            })?
            .map(|mac| mac.bytes());
        let ids = Self::from_parts(mac, std::process::id());
        #[cfg(feature = "tracing")]
        tracing::debug!(
            worker_id = ids.worker_id,
            region_id = ids.region_id,
            has_mac = mac.is_some(),
            "derived process ids"
        );
        Ok(ids)
    }

    pub const fn worker_id(self) -> u64 {
        self.worker_id
    }

    pub const fn region_id(self) -> u64 {
        self.region_id
    }

    /// A generator config carrying both derived IDs.
    pub fn config(self) -> GeneratorConfig {
        GeneratorConfig::new(self.worker_id).with_region_id(self.region_id)
    }
}

impl WorkerIdSource for ProcessWorkerId {
    fn ensure_namespace(&self) -> Result<()> {
        Ok(())
    }

    fn lookup(&self, _host: &str) -> Result<Option<u64>> {
        Ok(Some(self.worker_id))
    }

    fn allocate(&self, _host: &str) -> Result<u64> {
        Ok(self.worker_id)
    }

    fn persist(&self, _host: &str, _worker_id: u64) -> Result<()> {
        Ok(())
    }
}

/// 31-based polynomial hash over UTF-16 code units with 32-bit wraparound.
///
/// Kept bit-for-bit stable so processes derive the same worker IDs as
/// existing deployments did.
fn string_hash(s: &str) -> u32 {
    s.encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(u32::from(unit)))
}

/// Returns the address of this machine's outbound interface, for use as the
/// host identifier in the coordination store.
///
/// # Errors
///
/// Returns [`Error::HostDetection`] if no usable local address is found.
#[cfg(feature = "host")]
#[cfg_attr(feature = "tracing", instrument(level = "debug"))]
pub fn local_host_id() -> Result<String> {
    let ip = local_ip_address::local_ip().map_err(|err| Error::HostDetection {
        reason: err.to_string(),
    })?;
    Ok(ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::string_hash;

    #[test]
    fn hash_matches_reference_values() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("1"), 49);
        assert_eq!(string_hash("71234"), 52_303_097);
        // wraps instead of overflowing
        assert_eq!(string_hash("polygenelubricants"), i32::MIN as u32);
    }
}
