//! Membership registry implementation.
//!
//! ## Architecture
//!
//! The registry keeps a bi-directional mapping in the arena style:
//!
//! - **Arena**: `Vec<Member>` indexed by `MemberId`; records are never
//!   removed, so ids are stable forever and the ledger can key balances
//!   densely by the same id
//! - **Reverse map**: `HashMap<Address, MemberId>` pointing at the latest
//!   record for an address; addresses are only a lookup key, never the
//!   storage key
//! - **Device map**: `HashMap<DeviceId, MemberId>` resolving metering
//!   devices to their owning member
//!
//! Re-adding a previously removed address allocates a fresh arena record and
//! repoints the reverse map; the old record stays inactive with its balance
//! history intact.

use std::collections::{HashMap, HashSet};

use crate::error::{EngineError, EngineResult};
use crate::registry::Member;
use crate::types::{DeviceId, MemberId};

/// Hard cap on combined active ownership (100% in basis points).
pub const MAX_OWNERSHIP_BPS: u32 = 10_000;

/// Registry of members, devices, and caller authorization.
#[derive(Debug, Default)]
pub struct MembershipRegistry {
    /// Member arena; index is the MemberId, ids are never reused
    members: Vec<Member>,

    /// Latest arena record for each external address
    by_address: HashMap<String, MemberId>,

    /// Device to owning member
    devices: HashMap<DeviceId, MemberId>,

    /// Addresses allowed to call mutating operations
    whitelist: HashSet<String>,

    /// Designated device standing for shared community consumption
    community_device: Option<DeviceId>,
}

impl MembershipRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// Register a member with its devices and ownership share.
    ///
    /// Fails `AlreadyActive` if the address maps to an active member and
    /// `OwnershipExceeded` if the combined active ownership would pass
    /// [`MAX_OWNERSHIP_BPS`]. Each device id is bound to the new member,
    /// silently overwriting any prior owner.
    ///
    /// # Returns
    ///
    /// The arena id of the new member record
    pub fn add_member(
        &mut self,
        address: &str,
        device_ids: &[DeviceId],
        share_bps: u32,
    ) -> EngineResult<MemberId> {
        if let Some(&existing) = self.by_address.get(address) {
            if self.members[existing as usize].is_active() {
                return Err(EngineError::AlreadyActive {
                    address: address.to_string(),
                });
            }
        }

        let total_bps = self.active_ownership_bps() as u64 + share_bps as u64;
        if total_bps > MAX_OWNERSHIP_BPS as u64 {
            return Err(EngineError::OwnershipExceeded { total_bps });
        }

        let id = self.members.len() as MemberId;
        self.members.push(Member::new(address, share_bps));
        self.by_address.insert(address.to_string(), id);

        for &device_id in device_ids {
            self.assign_device(device_id, id);
        }

        Ok(id)
    }

    /// Deactivate a member.
    ///
    /// Device bindings and the recorded share stay untouched; rebalancing
    /// after departure is an external governance action.
    pub fn remove_member(&mut self, address: &str) -> EngineResult<MemberId> {
        let id = self.require_member(address)?;
        let member = &mut self.members[id as usize];
        if !member.is_active() {
            return Err(EngineError::MemberNotActive {
                address: address.to_string(),
            });
        }
        member.deactivate();
        Ok(id)
    }

    /// Arena id for an address, whether or not the member is active.
    pub fn require_member(&self, address: &str) -> EngineResult<MemberId> {
        self.by_address
            .get(address)
            .copied()
            .ok_or_else(|| EngineError::UnknownMember {
                address: address.to_string(),
            })
    }

    /// Arena id for an address; the member must be active.
    pub fn require_active(&self, address: &str) -> EngineResult<MemberId> {
        let id = self.require_member(address)?;
        if !self.members[id as usize].is_active() {
            return Err(EngineError::MemberNotActive {
                address: address.to_string(),
            });
        }
        Ok(id)
    }

    /// Look up a member record by arena id.
    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.get(id as usize)
    }

    /// Latest arena id for an address, if any.
    pub fn member_by_address(&self, address: &str) -> Option<MemberId> {
        self.by_address.get(address).copied()
    }

    /// Number of arena records ever registered (active and inactive).
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Combined ownership of active members in basis points.
    pub fn active_ownership_bps(&self) -> u32 {
        self.members
            .iter()
            .filter(|m| m.is_active())
            .map(|m| m.share_bps())
            .sum()
    }

    /// All member records in ascending arena id order.
    ///
    /// This ordering is canonical: the ledger enumerates participants in
    /// exactly this order.
    pub fn iter(&self) -> impl Iterator<Item = (MemberId, &Member)> {
        self.members
            .iter()
            .enumerate()
            .map(|(idx, member)| (idx as MemberId, member))
    }

    // ========================================================================
    // Devices
    // ========================================================================

    /// Owning member of a device, if registered.
    pub fn device_owner(&self, device_id: DeviceId) -> Option<MemberId> {
        self.devices.get(&device_id).copied()
    }

    /// Resolve a device to an active owning member.
    ///
    /// Fails `DeviceNotFound` for unknown devices and `MemberNotActive`
    /// when the owner has left. The designated community device gets the
    /// stronger `CommunityOwnerUnresolved`, since an unresolvable community
    /// owner is a misconfiguration rather than a user mistake.
    pub fn resolve_device(&self, device_id: DeviceId) -> EngineResult<MemberId> {
        let owner = self
            .devices
            .get(&device_id)
            .copied()
            .ok_or(EngineError::DeviceNotFound { device_id })?;
        if self.members[owner as usize].is_active() {
            return Ok(owner);
        }
        if self.community_device == Some(device_id) {
            return Err(EngineError::CommunityOwnerUnresolved { device_id });
        }
        Err(EngineError::MemberNotActive {
            address: self.members[owner as usize].address().to_string(),
        })
    }

    /// Designate the device standing for shared community consumption.
    ///
    /// Validated at configuration time: the device must exist and resolve
    /// to an active member.
    pub fn set_community_device(&mut self, device_id: DeviceId) -> EngineResult<()> {
        let owner = self
            .devices
            .get(&device_id)
            .copied()
            .ok_or(EngineError::DeviceNotFound { device_id })?;
        if !self.members[owner as usize].is_active() {
            return Err(EngineError::CommunityOwnerUnresolved { device_id });
        }
        self.community_device = Some(device_id);
        Ok(())
    }

    /// The designated community device, if configured.
    pub fn community_device(&self) -> Option<DeviceId> {
        self.community_device
    }

    /// Member currently standing behind the community device.
    ///
    /// Re-checks resolution on every call; configuration can rot if the
    /// owner is later removed.
    pub fn community_owner(&self) -> EngineResult<MemberId> {
        let device_id = self
            .community_device
            .ok_or(EngineError::CommunityDeviceUnset)?;
        self.resolve_device(device_id)
    }

    fn assign_device(&mut self, device_id: DeviceId, owner: MemberId) {
        if let Some(previous) = self.devices.insert(device_id, owner) {
            if previous != owner {
                self.members[previous as usize].detach_device(device_id);
            }
        }
        self.members[owner as usize].attach_device(device_id);
    }

    // ========================================================================
    // Authorization
    // ========================================================================

    /// Allow or revoke a caller address.
    pub fn set_whitelist(&mut self, address: &str, allowed: bool) {
        if allowed {
            self.whitelist.insert(address.to_string());
        } else {
            self.whitelist.remove(address);
        }
    }

    /// Whether an address may call mutating operations.
    pub fn is_authorized(&self, address: &str) -> bool {
        self.whitelist.contains(address)
    }

    /// Gate used by every mutating entry point.
    pub fn require_authorized(&self, address: &str) -> EngineResult<()> {
        if self.is_authorized(address) {
            return Ok(());
        }
        Err(EngineError::NotAuthorized {
            address: address.to_string(),
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_registry() -> MembershipRegistry {
        let mut registry = MembershipRegistry::new();
        registry.add_member("0xaaa", &[10], 3000).unwrap();
        registry.add_member("0xbbb", &[20, 21], 2500).unwrap();
        registry
    }

    #[test]
    fn test_add_member_assigns_sequential_ids() {
        let mut registry = MembershipRegistry::new();
        assert_eq!(registry.add_member("0xaaa", &[], 3000).unwrap(), 0);
        assert_eq!(registry.add_member("0xbbb", &[], 2500).unwrap(), 1);
        assert_eq!(registry.member_count(), 2);
        assert_eq!(registry.active_ownership_bps(), 5500);
    }

    #[test]
    fn test_add_member_already_active() {
        let mut registry = seed_registry();
        let err = registry.add_member("0xaaa", &[], 100).unwrap_err();
        assert_eq!(
            err,
            EngineError::AlreadyActive {
                address: "0xaaa".into()
            }
        );
    }

    #[test]
    fn test_add_member_ownership_exceeded() {
        let mut registry = seed_registry();
        // 3000 + 2500 + 5000 > 10000
        let err = registry.add_member("0xccc", &[], 5000).unwrap_err();
        assert_eq!(err, EngineError::OwnershipExceeded { total_bps: 10500 });
        // Sitting exactly at the cap is allowed
        registry.add_member("0xccc", &[], 4500).unwrap();
        assert_eq!(registry.active_ownership_bps(), 10_000);
    }

    #[test]
    fn test_remove_member_deactivates_only() {
        let mut registry = seed_registry();
        let id = registry.remove_member("0xbbb").unwrap();

        let member = registry.member(id).unwrap();
        assert!(!member.is_active());
        assert_eq!(member.devices(), &[20, 21]);
        assert_eq!(member.share_bps(), 2500);
        // Inactive shares drop out of the active total
        assert_eq!(registry.active_ownership_bps(), 3000);

        let err = registry.remove_member("0xbbb").unwrap_err();
        assert_eq!(
            err,
            EngineError::MemberNotActive {
                address: "0xbbb".into()
            }
        );
        let err = registry.remove_member("0xzzz").unwrap_err();
        assert_eq!(
            err,
            EngineError::UnknownMember {
                address: "0xzzz".into()
            }
        );
    }

    #[test]
    fn test_readd_allocates_fresh_id() {
        let mut registry = seed_registry();
        registry.remove_member("0xaaa").unwrap();

        let new_id = registry.add_member("0xaaa", &[], 1000).unwrap();
        assert_eq!(new_id, 2);
        assert_eq!(registry.member_by_address("0xaaa"), Some(2));
        // The old record stays in the arena, inactive
        assert!(!registry.member(0).unwrap().is_active());
        assert_eq!(registry.member_count(), 3);
    }

    #[test]
    fn test_device_overwrite_moves_ownership() {
        let mut registry = seed_registry();
        // 0xccc claims device 20, previously owned by 0xbbb
        let id = registry.add_member("0xccc", &[20], 1000).unwrap();

        assert_eq!(registry.device_owner(20), Some(id));
        let previous = registry.member_by_address("0xbbb").unwrap();
        assert_eq!(registry.member(previous).unwrap().devices(), &[21]);
        assert_eq!(registry.member(id).unwrap().devices(), &[20]);
    }

    #[test]
    fn test_resolve_device() {
        let mut registry = seed_registry();

        let owner = registry.resolve_device(10).unwrap();
        assert_eq!(registry.member(owner).unwrap().address(), "0xaaa");

        assert_eq!(
            registry.resolve_device(999).unwrap_err(),
            EngineError::DeviceNotFound { device_id: 999 }
        );

        registry.remove_member("0xaaa").unwrap();
        assert_eq!(
            registry.resolve_device(10).unwrap_err(),
            EngineError::MemberNotActive {
                address: "0xaaa".into()
            }
        );
    }

    #[test]
    fn test_community_device_configuration() {
        let mut registry = seed_registry();

        assert_eq!(
            registry.community_owner().unwrap_err(),
            EngineError::CommunityDeviceUnset
        );
        assert_eq!(
            registry.set_community_device(999).unwrap_err(),
            EngineError::DeviceNotFound { device_id: 999 }
        );

        registry.set_community_device(10).unwrap();
        assert_eq!(registry.community_device(), Some(10));
        assert_eq!(registry.community_owner().unwrap(), 0);
    }

    #[test]
    fn test_community_owner_rot_is_detected() {
        let mut registry = seed_registry();
        registry.set_community_device(10).unwrap();

        // The community member leaving breaks resolution with the
        // configuration-class error, not the ordinary inactive error
        registry.remove_member("0xaaa").unwrap();
        assert_eq!(
            registry.community_owner().unwrap_err(),
            EngineError::CommunityOwnerUnresolved { device_id: 10 }
        );
        assert_eq!(
            registry.resolve_device(10).unwrap_err(),
            EngineError::CommunityOwnerUnresolved { device_id: 10 }
        );
    }

    #[test]
    fn test_whitelist() {
        let mut registry = MembershipRegistry::new();

        assert!(!registry.is_authorized("0xop"));
        assert!(registry.require_authorized("0xop").is_err());

        registry.set_whitelist("0xop", true);
        assert!(registry.is_authorized("0xop"));
        registry.require_authorized("0xop").unwrap();

        registry.set_whitelist("0xop", false);
        assert!(!registry.is_authorized("0xop"));
    }

    #[test]
    fn test_iter_is_ascending_by_id() {
        let registry = seed_registry();
        let ids: Vec<MemberId> = registry.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 1]);
    }
}
