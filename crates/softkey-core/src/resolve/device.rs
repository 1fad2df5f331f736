//! Device-family specializations and row composition.
//!
//! [`DeviceSpecialization`] decides which non-character keys surround the
//! character rows and where they go.  Composition produces a draft
//! [`LayoutPage`] whose keys carry width *policies*; actual widths are
//! assigned afterwards by [`super::normalize`].
//!
//! | Specialization        | Last character row          | Extra column          | Bottom row                                   |
//! |-----------------------|-----------------------------|-----------------------|----------------------------------------------|
//! | Phone                 | left key + chars + ⌫        | none                  | mode, globe/emoji, [mic], space, return      |
//! | Pad                   | left + chars + `, .` + right| ⌫ on row 1, ⏎ on row 2| mode, globe/emoji, [mic], space, mode, hide  |
//! | PadPro (extended)     | as Pad                      | digit row, tab, caps  | as Pad                                       |
//!
//! PadPro switches to the extended key set only when the screen is at least
//! [`PAD_PRO_EXTENDED_MIN_WIDTH`] points wide; otherwise it composes like Pad.

use serde::{Deserialize, Serialize};

use crate::domain::configuration::{DeviceFamily, LayoutConfiguration, ScreenSize};
use crate::domain::input_set::{InputItem, InputSet, KeyboardMode};
use crate::domain::layout::{Insets, KeyAction, LayoutItem, LayoutPage, LayoutRow, WidthPolicy};
use crate::registry::LocaleOverride;

use super::normalize::key_unit;

/// Screen width from which a pad-pro gets the extended key set.
pub const PAD_PRO_EXTENDED_MIN_WIDTH: u32 = 1024;

/// Weight of the space bar relative to other flexible keys.
const SPACE_WEIGHT: u32 = 4;

/// The device specialization chosen for one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceSpecialization {
    Phone,
    Pad,
    PadPro { extended: bool },
}

impl DeviceSpecialization {
    /// Selects the specialization for the keyboard's device family.
    pub fn select(family: DeviceFamily, screen_size: ScreenSize) -> Self {
        match family {
            DeviceFamily::Phone => DeviceSpecialization::Phone,
            DeviceFamily::Pad => DeviceSpecialization::Pad,
            DeviceFamily::PadPro => DeviceSpecialization::PadPro {
                extended: screen_size.width >= PAD_PRO_EXTENDED_MIN_WIDTH,
            },
        }
    }

    pub fn is_extended(self) -> bool {
        matches!(self, DeviceSpecialization::PadPro { extended: true })
    }

    fn uses_pad_columns(self) -> bool {
        !matches!(self, DeviceSpecialization::Phone)
    }
}

/// Bottom-row switches taken from the runtime context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BottomRowFlags {
    pub needs_input_mode_switch_key: bool,
    pub has_dictation_key: bool,
}

/// Character keys after the locale override has been applied.
#[derive(Debug, Clone, Copy)]
pub struct KeySource<'a> {
    input_set: &'a InputSet,
    strategy: Option<&'a LocaleOverride>,
}

impl<'a> KeySource<'a> {
    pub fn new(input_set: &'a InputSet, strategy: Option<&'a LocaleOverride>) -> Self {
        Self { input_set, strategy }
    }

    /// Override rows when the strategy provides them, input set rows otherwise.
    pub fn group(&self, mode: KeyboardMode) -> &'a [Vec<InputItem>] {
        self.strategy
            .and_then(|s| s.group(mode))
            .unwrap_or_else(|| self.input_set.group(mode))
    }

    fn space_row_characters(&self) -> &'a [InputItem] {
        self.strategy
            .map(|s| s.space_row_characters.as_slice())
            .unwrap_or_default()
    }

    fn pad_punctuation(&self) -> &'a [InputItem] {
        self.input_set.pad_punctuation()
    }
}

/// Width class of a draft key, turned into a [`WidthPolicy`] once the key unit is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeySize {
    /// One key unit.
    Unit,
    /// A percentage of the key unit.
    Scaled(u32),
    Flexible(u32),
}

#[derive(Debug, Clone)]
struct DraftKey {
    action: KeyAction,
    size: KeySize,
}

impl DraftKey {
    fn character(item: &InputItem) -> Self {
        Self {
            action: KeyAction::Character(item.clone()),
            size: KeySize::Unit,
        }
    }

    fn flexible(action: KeyAction) -> Self {
        Self {
            action,
            size: KeySize::Flexible(1),
        }
    }

    fn scaled(action: KeyAction, percent: u32) -> Self {
        Self {
            action,
            size: KeySize::Scaled(percent),
        }
    }
}

/// Composes the draft page for `mode`.
///
/// The returned page has final widths for fixed keys and zero widths for
/// flexible keys; row insets are the configured side insets.
pub fn compose_page(
    device: DeviceSpecialization,
    mode: KeyboardMode,
    keys: &KeySource<'_>,
    flags: BottomRowFlags,
    configuration: &LayoutConfiguration,
    total_width: u32,
) -> LayoutPage {
    let mut rows = match device {
        DeviceSpecialization::Phone => phone_rows(mode, keys),
        DeviceSpecialization::PadPro { extended: true } if mode == KeyboardMode::Alphabetic => {
            extended_rows(keys)
        }
        DeviceSpecialization::Pad | DeviceSpecialization::PadPro { .. } => pad_rows(mode, keys),
    };

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let unit = key_unit(total_width, columns as u32, configuration);

    rows.push(bottom_row(device, mode, keys, flags, configuration));

    LayoutPage {
        mode,
        rows: rows
            .into_iter()
            .map(|draft| materialize(draft, unit, configuration))
            .collect(),
    }
}

/// The key at the left of the last character row on each page.
fn page_left_key(mode: KeyboardMode) -> KeyAction {
    match mode {
        KeyboardMode::Alphabetic => KeyAction::Shift,
        KeyboardMode::Numeric => KeyAction::ModeSwitch {
            target: KeyboardMode::Symbolic,
        },
        KeyboardMode::Symbolic => KeyAction::ModeSwitch {
            target: KeyboardMode::Numeric,
        },
    }
}

fn characters(row: &[InputItem]) -> impl Iterator<Item = DraftKey> + '_ {
    row.iter().map(DraftKey::character)
}

fn phone_rows(mode: KeyboardMode, keys: &KeySource<'_>) -> Vec<Vec<DraftKey>> {
    let group = keys.group(mode);
    let last = group.len().saturating_sub(1);
    group
        .iter()
        .enumerate()
        .map(|(i, row)| {
            if i == last {
                let mut draft = vec![DraftKey::flexible(page_left_key(mode))];
                draft.extend(characters(row));
                draft.push(DraftKey::flexible(KeyAction::Backspace));
                draft
            } else {
                characters(row).collect()
            }
        })
        .collect()
}

fn pad_rows(mode: KeyboardMode, keys: &KeySource<'_>) -> Vec<Vec<DraftKey>> {
    let group = keys.group(mode);
    let last = group.len().saturating_sub(1);
    let mut return_placed = false;
    let mut rows = Vec::with_capacity(group.len());

    for (i, row) in group.iter().enumerate() {
        let mut draft = Vec::with_capacity(row.len() + 4);
        if i == last {
            draft.push(DraftKey::flexible(page_left_key(mode)));
        }
        draft.extend(characters(row));
        if i == last && mode == KeyboardMode::Alphabetic {
            draft.extend(characters(keys.pad_punctuation()));
        }
        if i == 0 {
            draft.push(DraftKey::flexible(KeyAction::Backspace));
        } else if !return_placed {
            draft.push(DraftKey::flexible(KeyAction::Return));
            return_placed = true;
        }
        if i == last {
            if !return_placed && i == 0 {
                draft.push(DraftKey::flexible(KeyAction::Return));
            }
            draft.push(DraftKey::flexible(page_left_key(mode)));
        }
        rows.push(draft);
    }
    rows
}

fn extended_rows(keys: &KeySource<'_>) -> Vec<Vec<DraftKey>> {
    let group = keys.group(KeyboardMode::Alphabetic);
    let last = group.len().saturating_sub(1);

    let mut digits: Vec<DraftKey> = keys
        .group(KeyboardMode::Numeric)
        .first()
        .map(|row| characters(row).collect())
        .unwrap_or_default();
    digits.push(DraftKey::flexible(KeyAction::Backspace));

    let mut rows = vec![digits];
    let mut return_placed = false;
    for (i, row) in group.iter().enumerate() {
        let mut draft = Vec::with_capacity(row.len() + 4);
        if i == last {
            draft.push(DraftKey::flexible(KeyAction::Shift));
            draft.extend(characters(row));
            draft.extend(characters(keys.pad_punctuation()));
            if !return_placed {
                draft.push(DraftKey::flexible(KeyAction::Return));
            }
            draft.push(DraftKey::flexible(KeyAction::Shift));
        } else if i == 0 {
            draft.push(DraftKey::flexible(KeyAction::Tab));
            draft.extend(characters(row));
        } else if !return_placed {
            draft.push(DraftKey::flexible(KeyAction::CapsLock));
            draft.extend(characters(row));
            draft.push(DraftKey::flexible(KeyAction::Return));
            return_placed = true;
        } else {
            draft.extend(characters(row));
        }
        rows.push(draft);
    }
    rows
}

fn bottom_row(
    device: DeviceSpecialization,
    mode: KeyboardMode,
    keys: &KeySource<'_>,
    flags: BottomRowFlags,
    configuration: &LayoutConfiguration,
) -> Vec<DraftKey> {
    let function = configuration.function_key_percent;
    let mode_switch = KeyAction::ModeSwitch {
        target: match mode {
            KeyboardMode::Alphabetic => KeyboardMode::Numeric,
            KeyboardMode::Numeric | KeyboardMode::Symbolic => KeyboardMode::Alphabetic,
        },
    };

    let mut row = vec![DraftKey::scaled(mode_switch.clone(), function)];
    let switcher = if flags.needs_input_mode_switch_key {
        KeyAction::NextKeyboard
    } else {
        KeyAction::Emoji
    };
    row.push(DraftKey::scaled(switcher, function));
    if flags.has_dictation_key {
        row.push(DraftKey::scaled(KeyAction::Dictation, function));
    }
    row.extend(characters(keys.space_row_characters()));
    row.push(DraftKey {
        action: KeyAction::Space,
        size: KeySize::Flexible(SPACE_WEIGHT),
    });

    if device.uses_pad_columns() {
        row.push(DraftKey::scaled(mode_switch, function));
        row.push(DraftKey::scaled(KeyAction::Dismiss, function));
    } else {
        row.push(DraftKey::scaled(
            KeyAction::Return,
            configuration.return_key_percent,
        ));
    }
    row
}

fn materialize(draft: Vec<DraftKey>, unit: u32, configuration: &LayoutConfiguration) -> LayoutRow {
    let insets = Insets::symmetric(configuration.key_inset);
    let items = draft
        .into_iter()
        .map(|key| {
            let policy = match key.size {
                KeySize::Unit => WidthPolicy::Fixed(unit),
                KeySize::Scaled(percent) => WidthPolicy::Fixed(unit * percent / 100),
                KeySize::Flexible(weight) => WidthPolicy::Flexible {
                    weight,
                    min: configuration.min_key_width,
                },
            };
            LayoutItem::new(key.action, policy, insets)
        })
        .collect();

    LayoutRow {
        items,
        insets: Insets::symmetric(configuration.row_side_inset),
        height: configuration.key_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::configuration::Orientation;
    use crate::domain::input_set::rows;
    use crate::domain::locale::LocaleId;

    fn qwerty() -> InputSet {
        InputSet::new(
            LocaleId::parse("en").unwrap(),
            rows(&["q w e r t y u i o p", "a s d f g h j k l", "z x c v b n m"]),
            rows(&["1 2 3 4 5 6 7 8 9 0", "- / : ; ( ) $ & @ \"", ". , ? ! '"]),
            rows(&["[ ] { } # % ^ * + =", "_ \\ | ~ < > € £ ¥ •", ". , ? ! '"]),
        )
        .unwrap()
    }

    fn flags(globe: bool, dictation: bool) -> BottomRowFlags {
        BottomRowFlags {
            needs_input_mode_switch_key: globe,
            has_dictation_key: dictation,
        }
    }

    fn actions(row: &LayoutRow) -> Vec<KeyAction> {
        row.items.iter().map(|i| i.action.clone()).collect()
    }

    #[test]
    fn test_select_pad_pro_extended_only_on_wide_screens() {
        assert_eq!(
            DeviceSpecialization::select(DeviceFamily::PadPro, ScreenSize::new(1024, 1366)),
            DeviceSpecialization::PadPro { extended: true }
        );
        assert_eq!(
            DeviceSpecialization::select(DeviceFamily::PadPro, ScreenSize::new(834, 1194)),
            DeviceSpecialization::PadPro { extended: false }
        );
    }

    #[test]
    fn test_phone_alphabetic_page_has_shift_and_backspace_on_last_row() {
        let set = qwerty();
        let cfg = LayoutConfiguration::lookup(DeviceFamily::Phone, Orientation::Portrait);
        let page = compose_page(
            DeviceSpecialization::Phone,
            KeyboardMode::Alphabetic,
            &KeySource::new(&set, None),
            flags(false, false),
            &cfg,
            375,
        );

        assert_eq!(page.rows.len(), 4);
        let third = actions(&page.rows[2]);
        assert_eq!(third.first(), Some(&KeyAction::Shift));
        assert_eq!(third.last(), Some(&KeyAction::Backspace));
    }

    #[test]
    fn test_phone_bottom_row_uses_emoji_without_globe_requirement() {
        let set = qwerty();
        let cfg = LayoutConfiguration::lookup(DeviceFamily::Phone, Orientation::Portrait);
        let page = compose_page(
            DeviceSpecialization::Phone,
            KeyboardMode::Alphabetic,
            &KeySource::new(&set, None),
            flags(false, false),
            &cfg,
            375,
        );
        assert_eq!(
            actions(&page.rows[3]),
            vec![
                KeyAction::ModeSwitch { target: KeyboardMode::Numeric },
                KeyAction::Emoji,
                KeyAction::Space,
                KeyAction::Return,
            ]
        );
    }

    #[test]
    fn test_bottom_row_includes_globe_and_dictation_when_flagged() {
        let set = qwerty();
        let cfg = LayoutConfiguration::lookup(DeviceFamily::Phone, Orientation::Portrait);
        let page = compose_page(
            DeviceSpecialization::Phone,
            KeyboardMode::Numeric,
            &KeySource::new(&set, None),
            flags(true, true),
            &cfg,
            375,
        );
        let bottom = actions(&page.rows[3]);
        assert_eq!(bottom[0], KeyAction::ModeSwitch { target: KeyboardMode::Alphabetic });
        assert_eq!(bottom[1], KeyAction::NextKeyboard);
        assert_eq!(bottom[2], KeyAction::Dictation);
    }

    #[test]
    fn test_pad_adds_right_hand_column() {
        let set = qwerty();
        let cfg = LayoutConfiguration::lookup(DeviceFamily::Pad, Orientation::Portrait);
        let page = compose_page(
            DeviceSpecialization::Pad,
            KeyboardMode::Alphabetic,
            &KeySource::new(&set, None),
            flags(true, false),
            &cfg,
            768,
        );

        assert_eq!(page.rows[0].items.last().map(|i| &i.action), Some(&KeyAction::Backspace));
        assert_eq!(page.rows[1].items.last().map(|i| &i.action), Some(&KeyAction::Return));
        let third = actions(&page.rows[2]);
        assert_eq!(third.first(), Some(&KeyAction::Shift));
        assert_eq!(third.last(), Some(&KeyAction::Shift));
        assert!(third
            .iter()
            .any(|a| matches!(a, KeyAction::Character(item) if item.output == ",")));
        assert_eq!(page.rows[3].items.last().map(|i| &i.action), Some(&KeyAction::Dismiss));
    }

    #[test]
    fn test_extended_pad_pro_adds_digit_row_tab_and_caps_lock() {
        let set = qwerty();
        let cfg = LayoutConfiguration::lookup(DeviceFamily::PadPro, Orientation::Portrait);
        let page = compose_page(
            DeviceSpecialization::PadPro { extended: true },
            KeyboardMode::Alphabetic,
            &KeySource::new(&set, None),
            flags(true, false),
            &cfg,
            1024,
        );

        assert_eq!(page.rows.len(), 5);
        assert_eq!(page.rows[0].items.last().map(|i| &i.action), Some(&KeyAction::Backspace));
        assert_eq!(page.rows[1].items.first().map(|i| &i.action), Some(&KeyAction::Tab));
        assert_eq!(page.rows[2].items.first().map(|i| &i.action), Some(&KeyAction::CapsLock));
        assert_eq!(page.rows[2].items.last().map(|i| &i.action), Some(&KeyAction::Return));
    }

    #[test]
    fn test_extended_pad_pro_numeric_page_composes_like_pad() {
        let set = qwerty();
        let cfg = LayoutConfiguration::lookup(DeviceFamily::PadPro, Orientation::Portrait);
        let page = compose_page(
            DeviceSpecialization::PadPro { extended: true },
            KeyboardMode::Numeric,
            &KeySource::new(&set, None),
            flags(true, false),
            &cfg,
            1024,
        );
        assert_eq!(page.rows.len(), 4);
    }

    #[test]
    fn test_override_rows_replace_input_set_rows() {
        let set = qwerty();
        let strategy = LocaleOverride::new("single-row")
            .with_group(KeyboardMode::Alphabetic, rows(&["a b c"]))
            .unwrap();
        let source = KeySource::new(&set, Some(&strategy));
        assert_eq!(source.group(KeyboardMode::Alphabetic).len(), 1);
        assert_eq!(source.group(KeyboardMode::Numeric).len(), 3);
    }

    #[test]
    fn test_character_keys_are_fixed_at_key_unit() {
        let set = qwerty();
        let cfg = LayoutConfiguration::lookup(DeviceFamily::Phone, Orientation::Portrait);
        let page = compose_page(
            DeviceSpecialization::Phone,
            KeyboardMode::Alphabetic,
            &KeySource::new(&set, None),
            flags(false, false),
            &cfg,
            375,
        );
        assert!(page.rows[0]
            .items
            .iter()
            .all(|i| i.policy == WidthPolicy::Fixed(31)));
    }
}
