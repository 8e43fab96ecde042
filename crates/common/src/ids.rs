use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its database key.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying database key.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of a user. Issued by the external identity provider and
    /// opaque to this workspace.
    UserId
);
define_id!(
    /// Identifier of a book in the catalog.
    BookId
);
define_id!(
    /// Identifier of a catalog category.
    CategoryId
);
define_id!(
    /// Identifier of a user's cart.
    CartId
);
define_id!(
    /// Identifier of a single cart line.
    CartItemId
);
define_id!(
    /// Identifier of a placed order.
    OrderId
);
define_id!(
    /// Identifier of a wishlist row.
    WishlistEntryId
);
