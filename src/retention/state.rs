use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// The stored retention bits of one entity. Everything else is derived.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RetentionFlags: u16 {
        const KEEP = 1 << 0;
        const ALLOW_SHRINKING = 1 << 1;
        const ALLOW_OBFUSCATION = 1 << 2;
        const ALLOW_OPTIMIZATION = 1 << 3;
        const ASSUME_NO_SIDE_EFFECTS = 1 << 4;
        const SEED = 1 << 5;
        const BLANKET_KEPT = 1 << 6;
        const REACHABLE_FROM_CODE = 1 << 7;

        /// The permissions a keep rule may grant
        const ALLOWANCES = Self::ALLOW_SHRINKING.bits()
            | Self::ALLOW_OBFUSCATION.bits()
            | Self::ALLOW_OPTIMIZATION.bits();

        /// Bits owned by rule and seed application
        const CONFIGURATION = Self::KEEP.bits()
            | Self::ALLOWANCES.bits()
            | Self::ASSUME_NO_SIDE_EFFECTS.bits()
            | Self::SEED.bits()
            | Self::BLANKET_KEPT.bits();
    }
}

bitflags! {
    /// Kinds of member rules that matched an entity
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RuleClasses: u8 {
        const KEEP_CLASS_MEMBERS = 1 << 0;
        const KEEP_CLASSES_WITH_MEMBERS = 1 << 1;
    }
}

/// Retention record for one class, method or field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RetentionState {
    flags: RetentionFlags,
    classes: RuleClasses,
}

impl RetentionState {
    pub fn new(flags: RetentionFlags, classes: RuleClasses) -> Self {
        Self { flags, classes }
    }

    pub fn flags(&self) -> RetentionFlags {
        self.flags
    }

    pub fn rule_classes(&self) -> RuleClasses {
        self.classes
    }

    /// Seeds are unconditional roots
    pub(crate) fn set_seed(&mut self) {
        self.flags.insert(RetentionFlags::SEED | RetentionFlags::KEEP);
        self.flags.remove(RetentionFlags::BLANKET_KEPT);
    }

    /// Replace the configuration-derived bits, leaving reachability untouched
    pub(crate) fn set_configuration(&mut self, flags: RetentionFlags, classes: RuleClasses) {
        let reachable = self.flags & RetentionFlags::REACHABLE_FROM_CODE;
        self.flags = (flags & RetentionFlags::CONFIGURATION) | reachable;
        self.classes = classes;
    }

    /// Returns true when the entity was not marked before
    pub(crate) fn mark_reachable(&mut self) -> bool {
        let newly = !self.flags.contains(RetentionFlags::REACHABLE_FROM_CODE);
        self.flags.insert(RetentionFlags::REACHABLE_FROM_CODE);
        newly
    }

    pub(crate) fn clear_reachable(&mut self) {
        self.flags.remove(RetentionFlags::REACHABLE_FROM_CODE);
    }
}

/// Anything that carries a retention record.
///
/// The predicate formulas live here once; classes, methods and fields all
/// answer them through the same record.
pub trait Retainable {
    fn retention(&self) -> &RetentionState;

    fn has(&self, flag: RetentionFlags) -> bool {
        self.retention().flags().contains(flag)
    }

    /// Must not be deleted
    fn keep(&self) -> bool {
        self.has(RetentionFlags::KEEP)
    }

    fn allowshrinking(&self) -> bool {
        self.has(RetentionFlags::ALLOW_SHRINKING)
    }

    fn allowobfuscation(&self) -> bool {
        self.has(RetentionFlags::ALLOW_OBFUSCATION)
    }

    fn allowoptimization(&self) -> bool {
        self.has(RetentionFlags::ALLOW_OPTIMIZATION)
    }

    fn assumenosideeffects(&self) -> bool {
        self.has(RetentionFlags::ASSUME_NO_SIDE_EFFECTS)
    }

    fn is_blanket_kept(&self) -> bool {
        self.has(RetentionFlags::BLANKET_KEPT)
    }

    fn reachable_from_code(&self) -> bool {
        self.has(RetentionFlags::REACHABLE_FROM_CODE)
    }

    /// Whether the seeds list named this entity.
    /// Only kept for passes that predate the derived predicates.
    #[deprecated(note = "seeds are roots; use `root` or `keep`")]
    fn is_seed(&self) -> bool {
        self.has(RetentionFlags::SEED)
    }

    /// Configuration-only deletion check.
    /// Ignores reachability, so a referenced entity still reports true.
    #[deprecated(note = "use `can_delete_if_unused`, which also checks reachability")]
    fn can_delete(&self) -> bool {
        !self.keep()
    }

    fn can_delete_if_unused(&self) -> bool {
        !self.keep() && !self.reachable_from_code()
    }

    fn can_rename(&self) -> bool {
        !self.keep() || self.allowobfuscation()
    }

    /// For renamers allowed to override untargeted keep rules
    fn can_rename_if_ignoring_blanket_keep(&self) -> bool {
        self.can_rename() || self.is_blanket_kept()
    }

    fn keepnames(&self) -> bool {
        self.keep() && self.allowshrinking()
    }

    fn keepclassmembers(&self) -> bool {
        self.retention()
            .rule_classes()
            .contains(RuleClasses::KEEP_CLASS_MEMBERS)
    }

    fn keepclasseswithmembers(&self) -> bool {
        self.retention()
            .rule_classes()
            .contains(RuleClasses::KEEP_CLASSES_WITH_MEMBERS)
    }

    fn keepclassmembernames(&self) -> bool {
        self.keepclassmembers() && self.allowshrinking()
    }

    fn keepclasseswithmembernames(&self) -> bool {
        self.keepclasseswithmembers() && self.allowshrinking()
    }

    /// Kept for reasons beyond being referenced; starts the reachability closure
    fn root(&self) -> bool {
        self.keep() && !self.allowshrinking()
    }

    /// Never deleted nor renamed
    fn do_not_touch(&self) -> bool {
        self.keep() && !self.allowshrinking() && !self.allowobfuscation()
    }
}

impl Retainable for RetentionState {
    fn retention(&self) -> &RetentionState {
        self
    }
}
