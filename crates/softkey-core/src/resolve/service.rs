//! LayoutResolutionService: turns an input set and a runtime context into a
//! fully measured [`Layout`].
//!
//! # Pipeline (for beginners)
//!
//! 1. **Device selection** – the keyboard's device family (which is a phone
//!    while the keyboard floats) and the screen width pick a
//!    [`DeviceSpecialization`].
//! 2. **Strategy lookup** – the override registry is asked for the context
//!    locale.  The tier that matched (exact, language, base) is recorded in
//!    the layout so callers can tell which fallback applied.
//! 3. **Composition** – each keyboard page gets its character rows plus the
//!    device's function keys, with width *policies* rather than widths.
//! 4. **Normalization** – every row is stretched to exactly the screen width.
//! 5. **Assembly** – [`Layout::new`] re-checks width conservation.
//!
//! Nothing in this pipeline reads a clock or a random source, so the same
//! inputs always produce a byte-identical layout.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::InputSetCatalog;
use crate::domain::configuration::LayoutConfiguration;
use crate::domain::context::RuntimeContext;
use crate::domain::input_set::{InputSet, KeyboardMode};
use crate::domain::layout::{Layout, LayoutError, LayoutHeader};
use crate::domain::locale::LocaleId;
use crate::registry::LocaleOverrideRegistry;

use super::device::{compose_page, BottomRowFlags, DeviceSpecialization, KeySource};
use super::normalize::normalize_row;

/// Errors returned by [`LayoutResolutionService`].
#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
    /// No input set exists for the locale or its language.
    #[error("no input set for locale {0}")]
    MissingInputSet(LocaleId),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Resolves layouts against a shared override registry.
#[derive(Debug, Clone, Default)]
pub struct LayoutResolutionService {
    registry: Arc<LocaleOverrideRegistry>,
}

impl LayoutResolutionService {
    pub fn new(registry: Arc<LocaleOverrideRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<LocaleOverrideRegistry> {
        &self.registry
    }

    /// Resolves the layout for `input_set` under `context`.
    ///
    /// `configuration` supplies the metrics; the screen width is taken from
    /// the context.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Layout`] if a row cannot fit the screen width.
    pub fn resolve(
        &self,
        input_set: &InputSet,
        context: &RuntimeContext,
        configuration: &LayoutConfiguration,
    ) -> Result<Layout, ResolveError> {
        let screen_size = context.screen_size();
        let total_width = screen_size.width;
        let family = context.device_type_for_keyboard();
        let device = DeviceSpecialization::select(family, screen_size);

        let found = self.registry.lookup(context.locale());
        let strategy = found.applied();
        debug!(
            locale = %context.locale(),
            tier = ?strategy.tier,
            name = ?strategy.name,
            "locale strategy selected"
        );

        let keys = KeySource::new(input_set, found.strategy.as_deref());
        let flags = BottomRowFlags {
            needs_input_mode_switch_key: context.needs_input_mode_switch_key(),
            has_dictation_key: context.has_dictation_key(),
        };

        let mut pages = Vec::with_capacity(KeyboardMode::ALL.len());
        for mode in KeyboardMode::ALL {
            let mut page = compose_page(device, mode, &keys, flags, configuration, total_width);
            for (index, row) in page.rows.iter_mut().enumerate() {
                normalize_row(row, total_width, mode, index)?;
            }
            pages.push(page);
        }

        let layout = Layout::new(
            LayoutHeader {
                locale: context.locale().clone(),
                family,
                orientation: configuration.orientation,
                extended: device.is_extended(),
                total_width,
                configuration: *configuration,
                strategy,
            },
            pages,
        )?;

        info!(
            locale = %layout.locale,
            family = ?layout.family,
            orientation = ?layout.orientation,
            width = total_width,
            extended = layout.extended,
            "layout resolved"
        );
        Ok(layout)
    }

    /// Looks up the input set and metrics for `context`, then resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::MissingInputSet`] if the catalog has no set for
    /// the context locale, plus any error from [`Self::resolve`].
    pub fn resolve_from_catalog(
        &self,
        catalog: &InputSetCatalog,
        context: &RuntimeContext,
    ) -> Result<Layout, ResolveError> {
        let input_set = catalog
            .get(context.locale())
            .ok_or_else(|| ResolveError::MissingInputSet(context.locale().clone()))?;
        let configuration = LayoutConfiguration::lookup(
            context.device_type_for_keyboard(),
            context.orientation(),
        );
        self.resolve(&input_set, context, &configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::configuration::{DeviceFamily, ScreenSize};
    use crate::domain::layout::{KeyAction, StrategyTier};
    use crate::registry::LocaleOverride;

    fn context(locale: &str, family: DeviceFamily, width: u32, height: u32) -> RuntimeContext {
        RuntimeContext::new(
            LocaleId::parse(locale).unwrap(),
            family,
            ScreenSize::new(width, height),
        )
    }

    #[test]
    fn test_resolve_phone_portrait_produces_three_pages() {
        // Arrange
        let service = LayoutResolutionService::default();
        let catalog = InputSetCatalog::with_builtin().unwrap();
        let ctx = context("en-US", DeviceFamily::Phone, 375, 812);

        // Act
        let layout = service.resolve_from_catalog(&catalog, &ctx).unwrap();

        // Assert
        assert_eq!(layout.pages().len(), 3);
        assert_eq!(layout.strategy.tier, StrategyTier::Base);
        for page in layout.pages() {
            for row in &page.rows {
                assert_eq!(row.total_width(), 375);
            }
        }
    }

    #[test]
    fn test_resolve_unknown_locale_is_missing_input_set() {
        let service = LayoutResolutionService::default();
        let catalog = InputSetCatalog::with_builtin().unwrap();
        let ctx = context("xx-YY", DeviceFamily::Phone, 375, 812);

        let result = service.resolve_from_catalog(&catalog, &ctx);

        assert_eq!(
            result,
            Err(ResolveError::MissingInputSet(LocaleId::parse("xx-YY").unwrap()))
        );
    }

    #[test]
    fn test_resolve_records_language_tier() {
        let registry = Arc::new(LocaleOverrideRegistry::new());
        registry
            .try_register(LocaleId::parse("fr").unwrap(), LocaleOverride::new("french"))
            .unwrap();
        let service = LayoutResolutionService::new(registry);
        let catalog = InputSetCatalog::with_builtin().unwrap();
        let ctx = context("fr-CA", DeviceFamily::Phone, 375, 812);

        let layout = service.resolve_from_catalog(&catalog, &ctx).unwrap();

        assert_eq!(layout.strategy.tier, StrategyTier::Language);
        assert_eq!(layout.strategy.name.as_deref(), Some("french"));
    }

    #[test]
    fn test_resolve_too_narrow_screen_overflows() {
        let service = LayoutResolutionService::default();
        let catalog = InputSetCatalog::with_builtin().unwrap();
        let ctx = context("en", DeviceFamily::Phone, 40, 812);

        let result = service.resolve_from_catalog(&catalog, &ctx);

        assert!(matches!(result, Err(ResolveError::Layout(LayoutError::RowOverflow { .. }))));
    }

    #[test]
    fn test_floating_keyboard_on_pad_resolves_phone_layout() {
        let service = LayoutResolutionService::default();
        let catalog = InputSetCatalog::with_builtin().unwrap();
        let mut ctx = context("en", DeviceFamily::Pad, 320, 480);
        ctx.set_keyboard_floating(true);

        let layout = service.resolve_from_catalog(&catalog, &ctx).unwrap();

        assert_eq!(layout.family, DeviceFamily::Phone);
        let bottom = layout.page(KeyboardMode::Alphabetic).bottom_row().unwrap();
        assert!(bottom.find(&KeyAction::Dismiss).is_none());
    }
}
