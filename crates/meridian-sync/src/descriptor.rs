//! # Entity Descriptors
//!
//! One strategy table per entity kind instead of a copy-pasted upsert
//! function per collection. A descriptor tells the engine everything
//! kind-specific it needs: required fields, the default-value table applied
//! at creation, which fields never change on update, how the category
//! reference is resolved, and whether updates merge fields or replace the
//! document.
//!
//! ## Descriptor-Driven Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reconcile(kind, tenant, items)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  descriptor(kind) ──► required: ["id", "name"]                         │
//! │                       defaults: [("isActive", Bool(true)), ...]        │
//! │                       category_link: FallbackToGeneral                 │
//! │                       update: MergeFields                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  one generic per-item routine, driven by the table                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use meridian_core::EntityKind;

// =============================================================================
// Strategy Components
// =============================================================================

/// A generated business token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Pin,
    QrCode,
    Sku,
    SaleNumber,
    BranchCode,
}

/// Default applied to an absent field at creation time only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    /// Fixed boolean (active/availability flags default to true).
    Bool(bool),

    /// Numeric zero (monetary and quantity fields).
    Zero,

    /// Fixed integer.
    Int(i64),

    /// Fixed string.
    Str(&'static str),

    /// The tenant-configured standard tax rate.
    StandardTaxRate,

    /// A generated unique token (time + random suffix).
    Token(TokenKind),
}

/// How an entity's category reference is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryLink {
    /// No category reference.
    None,

    /// Missing `categoryId` is materialized-or-reused as the tenant/branch
    /// fallback category.
    FallbackToGeneral,

    /// `categoryId` is mandatory; records without it are rejected, not
    /// defaulted.
    Required,
}

/// How an existing record absorbs a re-submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// Incoming fields overwrite stored ones; absent fields are preserved.
    MergeFields,

    /// The incoming document replaces the stored one wholesale (opaque
    /// caller-owned documents).
    ReplaceDocument,
}

// =============================================================================
// Entity Descriptor
// =============================================================================

/// Everything kind-specific the generic reconciliation routine needs.
#[derive(Debug)]
pub struct EntityDescriptor {
    pub kind: EntityKind,

    /// Fields that must be present, non-null, and non-blank on every item.
    pub required: &'static [&'static str],

    /// Defaults applied at creation when the field is absent from the input.
    pub defaults: &'static [(&'static str, FieldDefault)],

    /// Fields preserved from the stored record on update. Identity and
    /// creation metadata always; generated business keys where regeneration
    /// would break references.
    pub immutable: &'static [&'static str],

    /// Category reference policy.
    pub category_link: CategoryLink,

    /// Whether records of this kind belong to a branch (and get the
    /// sentinel default branch when submitted without one).
    pub branch_scoped: bool,

    /// Update semantics.
    pub update: UpdateStrategy,
}

/// Identity and creation metadata preserved on every update.
const IMMUTABLE_BASE: &[&str] = &["id", "tenantId", "createdAt"];

static DESCRIPTORS: [EntityDescriptor; 11] = [
    EntityDescriptor {
        kind: EntityKind::Branch,
        required: &["id", "name"],
        defaults: &[
            ("code", FieldDefault::Token(TokenKind::BranchCode)),
            ("isActive", FieldDefault::Bool(true)),
        ],
        immutable: IMMUTABLE_BASE,
        category_link: CategoryLink::None,
        branch_scoped: false,
        update: UpdateStrategy::MergeFields,
    },
    EntityDescriptor {
        kind: EntityKind::Category,
        required: &["id", "name"],
        defaults: &[
            ("showInPos", FieldDefault::Bool(true)),
            ("sortOrder", FieldDefault::Zero),
        ],
        immutable: IMMUTABLE_BASE,
        category_link: CategoryLink::None,
        branch_scoped: true,
        update: UpdateStrategy::MergeFields,
    },
    EntityDescriptor {
        kind: EntityKind::Product,
        required: &["id", "name"],
        defaults: &[
            ("sku", FieldDefault::Token(TokenKind::Sku)),
            ("price", FieldDefault::Zero),
            ("cost", FieldDefault::Zero),
            ("stockQuantity", FieldDefault::Zero),
            ("unit", FieldDefault::Str("pcs")),
            ("taxRate", FieldDefault::StandardTaxRate),
            ("minStockLevel", FieldDefault::Zero),
            ("isActive", FieldDefault::Bool(true)),
        ],
        immutable: IMMUTABLE_BASE,
        category_link: CategoryLink::FallbackToGeneral,
        branch_scoped: true,
        update: UpdateStrategy::MergeFields,
    },
    EntityDescriptor {
        kind: EntityKind::Employee,
        required: &["id", "fullName"],
        defaults: &[
            ("role", FieldDefault::Str("staff")),
            ("hourlyRate", FieldDefault::Zero),
            ("pin", FieldDefault::Token(TokenKind::Pin)),
            ("qrCode", FieldDefault::Token(TokenKind::QrCode)),
            ("isActive", FieldDefault::Bool(true)),
        ],
        immutable: IMMUTABLE_BASE,
        category_link: CategoryLink::None,
        branch_scoped: true,
        update: UpdateStrategy::MergeFields,
    },
    EntityDescriptor {
        kind: EntityKind::CustomerAccount,
        required: &["id", "customerName"],
        defaults: &[
            ("balance", FieldDefault::Zero),
            ("creditLimit", FieldDefault::Zero),
            ("status", FieldDefault::Str("active")),
        ],
        // accountNumber is generated with a global-uniqueness check in the
        // engine, then never regenerated.
        immutable: &["id", "tenantId", "createdAt", "accountNumber"],
        category_link: CategoryLink::None,
        branch_scoped: true,
        update: UpdateStrategy::MergeFields,
    },
    EntityDescriptor {
        kind: EntityKind::MenuItem,
        required: &["id", "name", "categoryId"],
        defaults: &[
            ("price", FieldDefault::Zero),
            ("taxRate", FieldDefault::StandardTaxRate),
            ("isAvailable", FieldDefault::Bool(true)),
        ],
        immutable: IMMUTABLE_BASE,
        category_link: CategoryLink::Required,
        branch_scoped: true,
        update: UpdateStrategy::MergeFields,
    },
    EntityDescriptor {
        kind: EntityKind::Sale,
        required: &["id"],
        defaults: &[
            ("saleNumber", FieldDefault::Token(TokenKind::SaleNumber)),
            ("subtotal", FieldDefault::Zero),
            ("taxAmount", FieldDefault::Zero),
            ("total", FieldDefault::Zero),
            ("paymentMethod", FieldDefault::Str("cash")),
        ],
        immutable: &["id", "tenantId", "createdAt", "saleNumber"],
        category_link: CategoryLink::None,
        branch_scoped: true,
        update: UpdateStrategy::MergeFields,
    },
    EntityDescriptor {
        kind: EntityKind::Table,
        required: &["id", "name"],
        defaults: &[
            ("capacity", FieldDefault::Int(4)),
            ("status", FieldDefault::Str("available")),
            ("x", FieldDefault::Zero),
            ("y", FieldDefault::Zero),
        ],
        immutable: IMMUTABLE_BASE,
        category_link: CategoryLink::None,
        branch_scoped: true,
        update: UpdateStrategy::MergeFields,
    },
    EntityDescriptor {
        kind: EntityKind::TableSection,
        required: &["id", "name"],
        defaults: &[("sortOrder", FieldDefault::Zero)],
        immutable: IMMUTABLE_BASE,
        category_link: CategoryLink::None,
        branch_scoped: true,
        update: UpdateStrategy::MergeFields,
    },
    EntityDescriptor {
        kind: EntityKind::CashRegister,
        required: &["id"],
        defaults: &[
            ("openingBalance", FieldDefault::Zero),
            ("cashTotal", FieldDefault::Zero),
            ("cardTotal", FieldDefault::Zero),
            ("creditTotal", FieldDefault::Zero),
            ("isOpen", FieldDefault::Bool(true)),
        ],
        immutable: IMMUTABLE_BASE,
        category_link: CategoryLink::None,
        branch_scoped: true,
        update: UpdateStrategy::MergeFields,
    },
    EntityDescriptor {
        kind: EntityKind::AppSettings,
        required: &[],
        defaults: &[],
        immutable: IMMUTABLE_BASE,
        category_link: CategoryLink::None,
        branch_scoped: false,
        update: UpdateStrategy::ReplaceDocument,
    },
];

/// Returns the descriptor for an entity kind.
pub fn descriptor(kind: EntityKind) -> &'static EntityDescriptor {
    DESCRIPTORS
        .iter()
        .find(|d| d.kind == kind)
        .expect("every EntityKind has a descriptor")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_descriptor() {
        for kind in EntityKind::ALL {
            assert_eq!(descriptor(kind).kind, kind);
        }
    }

    #[test]
    fn id_is_always_immutable() {
        for kind in EntityKind::ALL {
            let desc = descriptor(kind);
            assert!(desc.immutable.contains(&"id"), "{kind} must preserve id");
            assert!(desc.immutable.contains(&"tenantId"));
            assert!(desc.immutable.contains(&"createdAt"));
        }
    }

    #[test]
    fn menu_items_never_default_their_category() {
        let desc = descriptor(EntityKind::MenuItem);
        assert_eq!(desc.category_link, CategoryLink::Required);
        assert!(desc.required.contains(&"categoryId"));
    }

    #[test]
    fn products_fall_back_to_the_general_category() {
        let desc = descriptor(EntityKind::Product);
        assert_eq!(desc.category_link, CategoryLink::FallbackToGeneral);
        assert!(!desc.required.contains(&"categoryId"));
    }

    #[test]
    fn app_settings_replace_wholesale() {
        let desc = descriptor(EntityKind::AppSettings);
        assert_eq!(desc.update, UpdateStrategy::ReplaceDocument);
        assert!(desc.required.is_empty());
    }
}
