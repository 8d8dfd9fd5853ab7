use crate::entities::Field;
use std::borrow::Cow;
use std::collections::HashSet;

/// Field outline palette, cycled in order
pub const FIELD_PALETTE: [(&str, &str); 8] = [
    ("green", "#16a34a"),
    ("blue", "#2563eb"),
    ("amber", "#d97706"),
    ("red", "#dc2626"),
    ("violet", "#7c3aed"),
    ("cyan", "#0891b2"),
    ("pink", "#db2777"),
    ("lime", "#65a30d"),
];

/// Color for freshly drawn fields
pub const DEFAULT_FIELD_COLOR: &str = FIELD_PALETTE[1].1;

/// Default plot color, also the fallback for unparseable hex strings
pub const DEFAULT_PLOT_COLOR: &str = "#16a34a";
const DEFAULT_RGB: (u8, u8, u8) = (22, 163, 74);

/// Pick the first palette color not in `used_colors`, starting at `seed`.
///
/// The chosen color is inserted into `used_colors`. Once the palette is
/// exhausted an HSL color derived from the seed is returned instead.
pub fn pick_available_field_color(used_colors: &mut HashSet<String>, seed: usize) -> String {
    let size = FIELD_PALETTE.len();
    let color = (0..size)
        .map(|offset| FIELD_PALETTE[(seed + offset) % size].1)
        .find(|hex| !used_colors.contains(*hex))
        .map(str::to_string)
        .unwrap_or_else(|| format!("hsl({}, 65%, 45%)", (seed % 360) * 47 % 360));

    used_colors.insert(color.clone());
    color
}

/// Assign colors to fields whose boundary has none.
///
/// Fields that already have a color, or no boundary at all, are returned
/// borrowed. Colored fields are cloned. The input is never modified.
pub fn ensure_field_colors(fields: &[Field]) -> Vec<Cow<'_, Field>> {
    let mut used_colors: HashSet<String> = fields
        .iter()
        .filter_map(|f| f.boundary.as_ref()?.color())
        .map(str::to_string)
        .collect();
    let total = fields.len();

    fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let needs_color = field.boundary.as_ref().is_some_and(|b| b.color().is_none());
            if !needs_color {
                return Cow::Borrowed(field);
            }

            let mut colored = field.clone();
            if let Some(boundary) = colored.boundary.as_mut() {
                boundary.properties.color =
                    Some(pick_available_field_color(&mut used_colors, index + total));
            }
            Cow::Owned(colored)
        })
        .collect()
}

/// Convert `#rrggbb` or `#rgb` into a CSS `rgba(...)` string.
pub fn hex_to_rgba(hex: &str, alpha: f64) -> String {
    let (r, g, b) = parse_hex(hex).unwrap_or(DEFAULT_RGB);
    format!("rgba({}, {}, {}, {})", r, g, b, alpha)
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.trim().strip_prefix('#')?;
    if !digits.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();

    match digits.len() {
        6 => Some((
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        )),
        3 => {
            let expand = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
            Some((expand(0)?, expand(1)?, expand(2)?))
        }
        _ => None,
    }
}
