//! Device geometry and the layout configuration table.
//!
//! [`LayoutConfiguration`] is plain data: the numeric constants one device
//! family uses in one orientation.  Values are never computed at runtime,
//! only selected with [`LayoutConfiguration::lookup`].
//!
//! All lengths are integer points.  Using integers keeps the width
//! normalization pass exact: a row either sums to the screen width or the
//! resolver reports an error.

use serde::{Deserialize, Serialize};

/// Device family classification that drives row composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceFamily {
    Phone,
    Pad,
    PadPro,
}

/// Interface orientation reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Screen size in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The orientation implied by the aspect ratio.  Square screens count as portrait.
    pub fn orientation(&self) -> Orientation {
        if self.width > self.height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// Sizing and spacing constants for one (device family, orientation) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutConfiguration {
    pub family: DeviceFamily,
    pub orientation: Orientation,
    /// Height of a standard key row.
    pub key_height: u32,
    /// Vertical gap above each row.
    pub row_top_inset: u32,
    /// Vertical gap below each row.
    pub row_bottom_inset: u32,
    /// Horizontal inset applied on each side of every key.
    pub key_inset: u32,
    /// Padding at the leading and trailing edge of every row.
    pub row_side_inset: u32,
    /// Smallest width a flexible key may be squeezed to.
    pub min_key_width: u32,
    /// Upper bound for the character key unit.
    pub max_key_width: u32,
    /// Width of bottom-row function keys, in percent of the key unit.
    pub function_key_percent: u32,
    /// Width of the bottom-row return key, in percent of the key unit.
    pub return_key_percent: u32,
}

impl LayoutConfiguration {
    /// Selects the constants for a device family and orientation.
    pub const fn lookup(family: DeviceFamily, orientation: Orientation) -> Self {
        match (family, orientation) {
            (DeviceFamily::Phone, Orientation::Portrait) => PHONE_PORTRAIT,
            (DeviceFamily::Phone, Orientation::Landscape) => PHONE_LANDSCAPE,
            (DeviceFamily::Pad, Orientation::Portrait) => PAD_PORTRAIT,
            (DeviceFamily::Pad, Orientation::Landscape) => PAD_LANDSCAPE,
            (DeviceFamily::PadPro, Orientation::Portrait) => PAD_PRO_PORTRAIT,
            (DeviceFamily::PadPro, Orientation::Landscape) => PAD_PRO_LANDSCAPE,
        }
    }

    /// Total height of one row including its vertical insets.
    pub fn row_height(&self) -> u32 {
        self.key_height + self.row_top_inset + self.row_bottom_inset
    }
}

const PHONE_PORTRAIT: LayoutConfiguration = LayoutConfiguration {
    family: DeviceFamily::Phone,
    orientation: Orientation::Portrait,
    key_height: 42,
    row_top_inset: 6,
    row_bottom_inset: 5,
    key_inset: 3,
    row_side_inset: 0,
    min_key_width: 20,
    max_key_width: 44,
    function_key_percent: 125,
    return_key_percent: 250,
};

const PHONE_LANDSCAPE: LayoutConfiguration = LayoutConfiguration {
    family: DeviceFamily::Phone,
    orientation: Orientation::Landscape,
    key_height: 32,
    row_top_inset: 4,
    row_bottom_inset: 3,
    key_inset: 3,
    row_side_inset: 0,
    min_key_width: 20,
    max_key_width: 64,
    function_key_percent: 150,
    return_key_percent: 250,
};

const PAD_PORTRAIT: LayoutConfiguration = LayoutConfiguration {
    family: DeviceFamily::Pad,
    orientation: Orientation::Portrait,
    key_height: 56,
    row_top_inset: 7,
    row_bottom_inset: 7,
    key_inset: 6,
    row_side_inset: 3,
    min_key_width: 30,
    max_key_width: 80,
    function_key_percent: 130,
    return_key_percent: 170,
};

const PAD_LANDSCAPE: LayoutConfiguration = LayoutConfiguration {
    family: DeviceFamily::Pad,
    orientation: Orientation::Landscape,
    key_height: 75,
    row_top_inset: 8,
    row_bottom_inset: 8,
    key_inset: 7,
    row_side_inset: 4,
    min_key_width: 40,
    max_key_width: 110,
    function_key_percent: 130,
    return_key_percent: 170,
};

const PAD_PRO_PORTRAIT: LayoutConfiguration = LayoutConfiguration {
    family: DeviceFamily::PadPro,
    orientation: Orientation::Portrait,
    key_height: 60,
    row_top_inset: 6,
    row_bottom_inset: 6,
    key_inset: 5,
    row_side_inset: 3,
    min_key_width: 30,
    max_key_width: 80,
    function_key_percent: 130,
    return_key_percent: 170,
};

const PAD_PRO_LANDSCAPE: LayoutConfiguration = LayoutConfiguration {
    family: DeviceFamily::PadPro,
    orientation: Orientation::Landscape,
    key_height: 70,
    row_top_inset: 7,
    row_bottom_inset: 7,
    key_inset: 6,
    row_side_inset: 4,
    min_key_width: 40,
    max_key_width: 100,
    function_key_percent: 130,
    return_key_percent: 170,
};
