//! Field positions for the DEA Form 222 overlay.
//!
//! The table is tuned at runtime while aligning output against the
//! pre-printed form. `CoordinateStore` holds the live value as an immutable
//! snapshot: an update builds a complete new configuration and swaps it in,
//! so a render that already took its snapshot never observes a half-merged
//! table.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{RenderError, RenderResult};

/// Form 222 sheet, landscape, in points.
pub const FORM222_PAGE_WIDTH: f32 = 792.0;
pub const FORM222_PAGE_HEIGHT: f32 = 612.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPosition {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    /// Advance between characters for fields printed into boxes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_spacing: Option<f32>,
}

impl FieldPosition {
    const fn at(x: f32, y: f32, size: f32) -> Self {
        FieldPosition {
            x,
            y,
            size,
            character_spacing: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldOffset {
    pub x_offset: f32,
    pub y_offset: f32,
}

impl FieldOffset {
    const fn new(x_offset: f32, y_offset: f32) -> Self {
        FieldOffset { x_offset, y_offset }
    }
}

/// Supplier block: one anchor plus an offset per printed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessFields {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub name: FieldOffset,
    pub street_address: FieldOffset,
    pub city: FieldOffset,
    pub state: FieldOffset,
    pub zip_code: FieldOffset,
}

impl Default for BusinessFields {
    fn default() -> Self {
        BusinessFields {
            x: 96.0,
            y: 548.0,
            size: 10.0,
            name: FieldOffset::new(0.0, 0.0),
            street_address: FieldOffset::new(0.0, -16.0),
            city: FieldOffset::new(0.0, -32.0),
            state: FieldOffset::new(150.0, -32.0),
            zip_code: FieldOffset::new(190.0, -32.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnPosition {
    pub x: f32,
    pub size: f32,
    /// Advance between digits for columns printed into boxes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digit_spacing: Option<f32>,
}

impl ColumnPosition {
    const fn at(x: f32, size: f32) -> Self {
        ColumnPosition {
            x,
            size,
            digit_spacing: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineItemColumns {
    pub line_number: ColumnPosition,
    pub packages: ColumnPosition,
    pub package_size: ColumnPosition,
    pub item_name: ColumnPosition,
    pub ndc: ColumnPosition,
}

impl Default for LineItemColumns {
    fn default() -> Self {
        LineItemColumns {
            line_number: ColumnPosition::at(40.0, 9.0),
            packages: ColumnPosition::at(64.0, 9.0),
            package_size: ColumnPosition::at(104.0, 9.0),
            item_name: ColumnPosition::at(168.0, 9.0),
            ndc: ColumnPosition {
                digit_spacing: Some(11.0),
                ..ColumnPosition::at(470.0, 9.0)
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineItemLayout {
    pub start_y: f32,
    pub line_height: f32,
    pub max_items_per_page: usize,
    pub columns: LineItemColumns,
}

impl Default for LineItemLayout {
    fn default() -> Self {
        LineItemLayout {
            start_y: 440.0,
            line_height: 17.0,
            max_items_per_page: 20,
            columns: LineItemColumns::default(),
        }
    }
}

impl LineItemLayout {
    /// Baseline of the row at `line_index` on the current page.
    pub fn line_item_y(&self, line_index: usize) -> RenderResult<f32> {
        if line_index >= self.max_items_per_page {
            return Err(RenderError::LineIndexOutOfRange {
                index: line_index,
                max: self.max_items_per_page,
            });
        }
        Ok(self.start_y - line_index as f32 * self.line_height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoordinateConfig {
    pub dea_number: FieldPosition,
    pub business: BusinessFields,
    pub order_date: FieldPosition,
    pub total_items: FieldPosition,
    pub page_number: FieldPosition,
    pub line_items: LineItemLayout,
}

impl Default for CoordinateConfig {
    fn default() -> Self {
        CoordinateConfig {
            dea_number: FieldPosition {
                character_spacing: Some(15.5),
                ..FieldPosition::at(600.0, 560.0, 11.0)
            },
            business: BusinessFields::default(),
            order_date: FieldPosition::at(452.0, 548.0, 10.0),
            total_items: FieldPosition::at(120.0, 72.0, 10.0),
            page_number: FieldPosition::at(680.0, 30.0, 9.0),
            line_items: LineItemLayout::default(),
        }
    }
}

impl CoordinateConfig {
    pub fn line_item_y(&self, line_index: usize) -> RenderResult<f32> {
        self.line_items.line_item_y(line_index)
    }

    /// Every line slot must land on the sheet.
    pub fn validate(&self) -> RenderResult<()> {
        let rows = &self.line_items;
        if rows.max_items_per_page == 0 {
            return Err(RenderError::InvalidInput(
                "lineItems.maxItemsPerPage must be at least 1".to_string(),
            ));
        }
        if rows.line_height <= 0.0 {
            return Err(RenderError::InvalidInput(
                "lineItems.lineHeight must be positive".to_string(),
            ));
        }
        let last = rows.start_y - (rows.max_items_per_page - 1) as f32 * rows.line_height;
        if rows.start_y > FORM222_PAGE_HEIGHT || last < 0.0 {
            return Err(RenderError::InvalidInput(format!(
                "line items span {last}..{} which leaves the page (0..{FORM222_PAGE_HEIGHT})",
                rows.start_y
            )));
        }
        Ok(())
    }
}

/// Inserts hyphens into an 11-digit NDC as 5-4-2. Anything else is returned
/// unchanged.
pub fn format_ndc(ndc11: &str) -> String {
    if ndc11.len() != 11 || !ndc11.bytes().all(|b| b.is_ascii_digit()) {
        return ndc11.to_string();
    }
    format!("{}-{}-{}", &ndc11[..5], &ndc11[5..9], &ndc11[9..])
}

/// Process-wide coordinate table.
#[derive(Debug)]
pub struct CoordinateStore {
    current: RwLock<Arc<CoordinateConfig>>,
}

impl Default for CoordinateStore {
    fn default() -> Self {
        CoordinateStore::new(CoordinateConfig::default())
    }
}

impl CoordinateStore {
    pub fn new(initial: CoordinateConfig) -> Self {
        CoordinateStore {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// The configuration renders should use right now.
    pub fn snapshot(&self) -> Arc<CoordinateConfig> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Merges `partial` into the live table, replacing each top-level key it
    /// names. Nested fields left out of a replaced group take their factory
    /// values.
    pub fn update(&self, partial: &Value) -> RenderResult<Arc<CoordinateConfig>> {
        let Value::Object(patch) = partial else {
            return Err(RenderError::InvalidInput(
                "coordinate update must be a JSON object".to_string(),
            ));
        };

        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut merged = serde_json::to_value(&**guard)
            .map_err(|e| RenderError::InvalidInput(e.to_string()))?;
        if let Value::Object(fields) = &mut merged {
            for (key, value) in patch {
                fields.insert(key.clone(), value.clone());
            }
        }

        let next: CoordinateConfig = serde_json::from_value(merged)
            .map_err(|e| RenderError::InvalidInput(format!("invalid coordinates: {e}")))?;
        next.validate()?;

        let next = Arc::new(next);
        *guard = Arc::clone(&next);
        info!(keys = ?patch.keys().collect::<Vec<_>>(), "coordinates updated");
        Ok(next)
    }

    pub fn reset(&self) -> Arc<CoordinateConfig> {
        let fresh = Arc::new(CoordinateConfig::default());
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&fresh);
        info!("coordinates reset to defaults");
        fresh
    }
}
