use eframe::egui::Color32;

/// Ten category colors; names without an explicit color hash into this set.
pub const NODE_PALETTE: [Color32; 10] = [
    Color32::from_rgb(0x1f, 0x77, 0xb4),
    Color32::from_rgb(0xff, 0x7f, 0x0e),
    Color32::from_rgb(0x2c, 0xa0, 0x2c),
    Color32::from_rgb(0xd6, 0x27, 0x28),
    Color32::from_rgb(0x94, 0x67, 0xbd),
    Color32::from_rgb(0x8c, 0x56, 0x4b),
    Color32::from_rgb(0xe3, 0x77, 0xc2),
    Color32::from_rgb(0x7f, 0x7f, 0x7f),
    Color32::from_rgb(0xbc, 0xbd, 0x22),
    Color32::from_rgb(0x17, 0xbe, 0xcf),
];

pub const MAX_RADIUS_BONUS: f32 = 15.0;
const RADIUS_PER_RELATION: f32 = 2.0;

/// Closed set of relation types with a dedicated stroke style.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Ally,
    Friend,
    Enemy,
    Rival,
    Family,
    Romantic,
    Mentor,
    Neutral,
}

impl RelationKind {
    pub const ALL: [Self; 8] = [
        Self::Ally,
        Self::Friend,
        Self::Enemy,
        Self::Rival,
        Self::Family,
        Self::Romantic,
        Self::Mentor,
        Self::Neutral,
    ];

    pub fn parse(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "ally" => Self::Ally,
            "friend" => Self::Friend,
            "enemy" => Self::Enemy,
            "rival" => Self::Rival,
            "family" => Self::Family,
            "romantic" | "romance" | "lover" => Self::Romantic,
            "mentor" => Self::Mentor,
            _ => Self::Neutral,
        }
    }

    pub fn color(self) -> Color32 {
        match self {
            Self::Ally => Color32::from_rgb(0x10, 0xb9, 0x81),
            Self::Friend => Color32::from_rgb(0x22, 0xc5, 0x5e),
            Self::Enemy => Color32::from_rgb(0xef, 0x44, 0x44),
            Self::Rival => Color32::from_rgb(0xf9, 0x73, 0x16),
            Self::Family => Color32::from_rgb(0x3b, 0x82, 0xf6),
            Self::Romantic => Color32::from_rgb(0xec, 0x48, 0x99),
            Self::Mentor => Color32::from_rgb(0x8b, 0x5c, 0xf6),
            Self::Neutral => Color32::from_rgb(0x6b, 0x72, 0x80),
        }
    }

    pub fn dashed(self) -> bool {
        self == Self::Enemy
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Ally => "Ally",
            Self::Friend => "Friend",
            Self::Enemy => "Enemy",
            Self::Rival => "Rival",
            Self::Family => "Family",
            Self::Romantic => "Romantic",
            Self::Mentor => "Mentor",
            Self::Neutral => "Other",
        }
    }
}

/// 32-bit `h * 31 + unit` over UTF-16 code units. Stable across runs and
/// platforms, unlike `std`'s hasher.
pub fn name_hash(name: &str) -> i32 {
    name.encode_utf16().fold(0_i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

pub fn palette_color(name: &str) -> Color32 {
    let index = name_hash(name).unsigned_abs() as usize % NODE_PALETTE.len();
    NODE_PALETTE[index]
}

/// Explicit `#rrggbb` color if it parses, otherwise the name palette color.
pub fn node_color(name: &str, explicit: Option<&str>) -> Color32 {
    if let Some(raw) = explicit {
        match Color32::from_hex(raw.trim()) {
            Ok(color) => return color,
            Err(_) => {
                tracing::warn!(color = raw, name, "ignoring unparseable entity color");
            }
        }
    }
    palette_color(name)
}

pub fn node_radius(base: f32, incident_relations: usize) -> f32 {
    base + (incident_relations as f32 * RADIUS_PER_RELATION).min(MAX_RADIUS_BONUS)
}

pub fn link_width(normalized_strength: f32) -> f32 {
    2.0 + normalized_strength * 4.0
}

pub fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

pub fn with_opacity(color: Color32, opacity: f32) -> Color32 {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    Color32::from_rgba_unmultiplied(r, g, b, (a as f32 * opacity.clamp(0.0, 1.0)) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_color_is_deterministic() {
        for name in ["Alice", "Bob", "Dr. Who", "ÉLODIE", ""] {
            assert_eq!(palette_color(name), palette_color(name));
        }
    }

    #[test]
    fn test_name_hash_matches_reference_values() {
        assert_eq!(name_hash(""), 0);
        assert_eq!(name_hash("a"), 97);
        assert_eq!(name_hash("ab"), 97 * 31 + 98);
        // Overflows wrap like 32-bit integer arithmetic.
        assert_eq!(name_hash("hello world"), 1_794_106_052);
    }

    #[test]
    fn test_explicit_color_wins() {
        assert_eq!(
            node_color("Alice", Some("#ff0000")),
            Color32::from_rgb(255, 0, 0)
        );
        assert_eq!(node_color("Alice", Some("not a color")), palette_color("Alice"));
        assert_eq!(node_color("Alice", None), palette_color("Alice"));
    }

    #[test]
    fn test_radius_monotonic_and_bounded() {
        for base in [8.0, 12.0, 16.0] {
            let mut previous = node_radius(base, 0);
            assert_eq!(previous, base);
            for count in 1..40 {
                let radius = node_radius(base, count);
                assert!(radius >= previous);
                assert!(radius <= base + MAX_RADIUS_BONUS);
                previous = radius;
            }
        }
    }

    #[test]
    fn test_relation_kind_lookup() {
        assert_eq!(RelationKind::parse("ENEMY"), RelationKind::Enemy);
        assert!(RelationKind::parse("Enemy").dashed());
        assert!(!RelationKind::parse("ally").dashed());
        assert_eq!(RelationKind::parse("nemesis-ish"), RelationKind::Neutral);
        assert_eq!(
            RelationKind::parse("something").color(),
            RelationKind::Neutral.color()
        );
    }

    #[test]
    fn test_link_width() {
        assert!((link_width(0.8) - 5.2).abs() < 1e-6);
        assert!((link_width(0.3) - 3.2).abs() < 1e-6);
    }
}
