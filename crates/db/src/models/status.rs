//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` / `proposal_item_sides` table.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Listing availability status.
    ListingStatus {
        Active = 1,
        Locked = 2,
        Traded = 3,
        Deleted = 4,
    }
}

define_status_enum! {
    /// Proposal lifecycle status. Pending is the only non-terminal state.
    ProposalStatus {
        Pending = 1,
        Accepted = 2,
        Rejected = 3,
        Cancelled = 4,
        Expired = 5,
    }
}

define_status_enum! {
    /// Swap settlement status.
    SwapStatus {
        InProgress = 1,
        Completed = 2,
        Canceled = 3,
    }
}

define_status_enum! {
    /// Which side of a proposal an item sits on.
    ItemSide {
        /// The proposer's item (what they give away).
        Offered = 1,
        /// The receiver's item (what the proposer wants).
        Requested = 2,
    }
}
