//! Opaque, derivable handles (`hParam`, `hEntity`, `hRequest`, `hConstraint`,
//! `hGroup`, `hStyle`), mirroring `examples/original_source/sketch.h`'s
//! handle types without the original's raw-pointer-graph-of-`IdList`
//! indirection.
//!
//! Each kind is a thin newtype over `u32`. Handle `0` is the universal
//! "none" sentinel for every kind (`Entity::NO_CSYS`, `FREE_IN_3D`, etc. in
//! the original all collapse to this one convention here). Entity and Param
//! handles are *derived*, never freely assigned: [`derive_owned`] packs an
//! owner id and a fixed sub-offset into one handle, the same role the
//! original's `Request::Generate`/`Group`'s own-param allocation plays
//! (`examples/original_source/request.cpp`).

use std::fmt;

/// Common interface the dense/sparse stores (`store.rs`) need from every
/// handle newtype: convert to and from the raw id space they index by.
pub trait HandleId: Copy + Eq + std::hash::Hash {
    fn from_u32(v: u32) -> Self;
    fn to_u32(&self) -> u32;
}

macro_rules! handle_newtype {
    ($name:ident) => {
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
        pub struct $name(pub u32);

        impl $name {
            pub const NONE: $name = $name(0);

            pub fn is_none(&self) -> bool {
                self.0 == 0
            }

            pub fn v(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0)
            }
        }

        impl HandleId for $name {
            fn from_u32(v: u32) -> Self {
                $name(v)
            }

            fn to_u32(&self) -> u32 {
                self.0
            }
        }
    };
}

handle_newtype!(HParam);
handle_newtype!(HEntity);
handle_newtype!(HRequest);
handle_newtype!(HConstraint);
handle_newtype!(HGroup);
handle_newtype!(HStyle);

/// The references-group, created once at session start and never dirtied by
/// the editor — matches `Group::HGROUP_REFERENCES`.
pub const HGROUP_REFERENCES: HGroup = HGroup(1);

/// Predefined reference-frame requests living in the references group,
/// matching `Request::HREQUEST_REFERENCE_{XY,YZ,ZX}`.
pub const HREQUEST_REFERENCE_XY: HRequest = HRequest(1);
pub const HREQUEST_REFERENCE_YZ: HRequest = HRequest(2);
pub const HREQUEST_REFERENCE_ZX: HRequest = HRequest(3);

const OWNER_SHIFT: u32 = 8;
const OFFSET_MASK: u32 = (1 << OWNER_SHIFT) - 1;
const GROUP_OWNED_FLAG: u32 = 1 << 31;

/// Packs an owner id and a fixed sub-offset into one handle value. `offset`
/// must fit in `OWNER_SHIFT` bits (0..256); every fixed offset used by
/// `Request`/`Group` generation is well under that, see `request.rs`.
fn derive_owned(owner: u32, offset: u32, group_owned: bool) -> u32 {
    debug_assert!(offset <= OFFSET_MASK, "entity/param sub-offset {offset} doesn't fit the packed handle");
    debug_assert!(owner < GROUP_OWNED_FLAG >> OWNER_SHIFT, "owner id {owner} too large to pack");
    let base = (owner << OWNER_SHIFT) | offset;
    if group_owned {
        base | GROUP_OWNED_FLAG
    } else {
        base
    }
}

impl HEntity {
    pub fn of_request(req: HRequest, offset: u32) -> HEntity {
        HEntity(derive_owned(req.0, offset, false))
    }

    pub fn of_group(group: HGroup, offset: u32) -> HEntity {
        HEntity(derive_owned(group.0, offset, true))
    }
}

impl HParam {
    pub fn of_request(req: HRequest, offset: u32) -> HParam {
        HParam(derive_owned(req.0, offset, false))
    }

    pub fn of_group(group: HGroup, offset: u32) -> HParam {
        HParam(derive_owned(group.0, offset, true))
    }
}

/// Fixed sub-offsets within a Request's entity/param space
/// (`examples/original_source/request.cpp`'s `Generate`).
pub mod offset {
    pub const PRIMARY_ENTITY: u32 = 0;
    pub const NORMAL_ENTITY: u32 = 32;
    pub const NORMAL_PARAMS: u32 = 32;
    pub const DISTANCE_ENTITY: u32 = 64;
    pub const DISTANCE_PARAM: u32 = 64;
    pub const POINT_PARAMS_BASE: u32 = 16;
    pub const POINT_PARAMS_STRIDE: u32 = 3;

    /// Entity offset of the `i`-th point after the primary entity. `et` is 1
    /// when a primary entity occupies offset 0 (most request kinds), 0 for
    /// `DATUM_POINT`, which has no primary entity of its own.
    pub fn point_entity(i: u32, et: u32) -> u32 {
        i + et
    }

    pub fn point_params(i: u32) -> u32 {
        POINT_PARAMS_BASE + POINT_PARAMS_STRIDE * i
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_injective_across_requests() {
        let mut seen = std::collections::HashSet::new();
        for req in 1..200u32 {
            for off in [0u32, 1, 2, 32, 33, 34, 35, 64] {
                let h = HEntity::of_request(HRequest(req), off);
                assert!(seen.insert(h.0), "collision at request {req} offset {off}");
            }
        }
    }

    #[test]
    fn request_and_group_owned_entities_never_collide() {
        let from_request = HEntity::of_request(HRequest(5), 0);
        let from_group = HEntity::of_group(HGroup(5), 0);
        assert_ne!(from_request, from_group);
    }

    #[test]
    fn none_is_the_zero_handle() {
        assert!(HEntity::NONE.is_none());
        assert_eq!(HEntity::NONE.v(), 0);
    }
}
