/// Tile types and their collision grammar.
///
/// A tile's behavior comes from a short composable code string rather than
/// an enum, because one tile may carry several traits at once (a liquid
/// with a partial surface, a slope that is also a one-way ledge, ...).
/// The string is parsed once into a `CollisionCode` when the catalog loads;
/// `resolve_code` then answers per-sample contact queries without touching
/// text again.
///
/// ## Glyphs
///   `#` `|`        fully solid box
///   `/` `\`        45° slope; trailing `0` = upper half solid, `1` = lower
///   `-`            one-way ledge (feet landing from directly above only)
///   `~`            liquid: never blocks, signals swim (or lethal)
///   `=` `_` `>` `<` partial box inset by the tile's `PartialBox`
///
/// ## Tile-local coordinates
///   Origin at the tile's top-left corner, x right, y DOWN, both in
///   `[0, tile_size)`.

use serde::Deserialize;
use tracing::warn;

/// Broad material class from the catalog. Only `Ice` changes physics.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileCategory {
    #[default]
    Ground,
    Ice,
    Liquid,
    Decoration,
}

/// Solid-region inset in tile units. Sign selects which edge is inset:
/// `height > 0` keeps the top `height` rows solid, `height < 0` insets the
/// top by `|height|`; likewise `width` for the left/right edges. Zero means
/// the full extent.
#[derive(Clone, Copy, PartialEq, Debug, Default, Deserialize)]
pub struct PartialBox {
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
}

impl PartialBox {
    /// Solid span `[start, end)` along one axis for a signed extent.
    fn span(extent: f32, tile_size: f32) -> (f32, f32) {
        if extent > 0.0 {
            (0.0, extent.min(tile_size))
        } else if extent < 0.0 {
            ((-extent).min(tile_size), tile_size)
        } else {
            (0.0, tile_size)
        }
    }

    pub fn x_span(&self, tile_size: f32) -> (f32, f32) {
        Self::span(self.width, tile_size)
    }

    pub fn y_span(&self, tile_size: f32) -> (f32, f32) {
        Self::span(self.height, tile_size)
    }
}

/// Immutable per-tile-type metadata. Loaded once by the catalog.
#[derive(Clone, Debug)]
pub struct TileType {
    pub idx: u32,
    pub solid: bool,
    pub code: CollisionCode,
    pub partial_box: PartialBox,
    pub category: TileCategory,
    /// Invisible until bumped: blocks upward approaches only.
    pub hidden: bool,
    /// Destroyed by a head bump.
    pub breakable: bool,
    /// Non-solid tile an actor with the climb capability can climb.
    pub climbable: bool,
    /// Index a hidden tile turns into once bumped.
    pub reveal_as: Option<u32>,
}

impl TileType {
    /// The empty tile used for unset cells and out-of-range lookups.
    pub fn air() -> Self {
        TileType {
            idx: 0,
            solid: false,
            code: CollisionCode::default(),
            partial_box: PartialBox::default(),
            category: TileCategory::Decoration,
            hidden: false,
            breakable: false,
            climbable: false,
            reveal_as: None,
        }
    }

    /// Does this tile take part in collision at all?
    pub fn collides(&self) -> bool {
        (self.solid && self.code.is_solid()) || self.code.liquid
    }

    pub fn is_ice(&self) -> bool {
        self.category == TileCategory::Ice
    }
}

// ══════════════════════════════════════════════════════════════
// Code grammar
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SlopeKind {
    /// `/` rises to the right.
    Rising,
    /// `\` falls to the right.
    Falling,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SlopeHalf {
    /// `0`: the half above the diagonal is solid (a ceiling slope).
    Upper,
    /// `1`: the half below the diagonal is solid (a floor slope).
    Lower,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Slope {
    pub kind: SlopeKind,
    /// `None` means the tile collides as a plain box.
    pub half: Option<SlopeHalf>,
}

impl Slope {
    /// Surface height (tile-local y) of the diagonal at tile-local x.
    ///
    /// `offset = y - (m * x + c)` with `m = -1, c = tile` for `/` and
    /// `m = 1, c = 0` for `\`.
    pub fn surface_at(&self, x: f32, tile_size: f32) -> f32 {
        let (m, c) = match self.kind {
            SlopeKind::Rising => (-1.0, tile_size),
            SlopeKind::Falling => (1.0, 0.0),
        };
        m * x + c
    }

    /// Tile-local x where the diagonal crosses height `y`.
    pub fn line_x(&self, y: f32, tile_size: f32) -> f32 {
        match self.kind {
            SlopeKind::Rising => tile_size - y,
            SlopeKind::Falling => y,
        }
    }

    /// Does a horizontal approach hit the slope's full-height vertical face?
    fn vertical_face(&self, velocity_x: f32) -> bool {
        use SlopeHalf::*;
        use SlopeKind::*;
        match (self.kind, self.half) {
            (Rising, Some(Lower)) | (Falling, Some(Upper)) => velocity_x < 0.0,
            (Falling, Some(Lower)) | (Rising, Some(Upper)) => velocity_x > 0.0,
            _ => false,
        }
    }
}

/// Parsed form of a collision code string.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionCode {
    pub solid_box: bool,
    pub slope: Option<Slope>,
    pub one_way: bool,
    pub liquid: bool,
    pub partial: bool,
    /// Unrecognized glyphs. Any entry makes the whole code non-solid.
    pub unknown: Vec<char>,
}

impl CollisionCode {
    /// Parse a code string. Never fails: unknown glyphs degrade the tile to
    /// non-solid and are logged once here, at catalog load.
    pub fn parse(code: &str) -> Self {
        let mut out = CollisionCode::default();
        let mut kind = None;
        let mut half = None;

        for ch in code.chars() {
            match ch {
                '#' | '|' => out.solid_box = true,
                '/' => kind = Some(SlopeKind::Rising),
                '\\' => kind = Some(SlopeKind::Falling),
                '0' => half = Some(SlopeHalf::Upper),
                '1' => half = Some(SlopeHalf::Lower),
                '-' => out.one_way = true,
                '~' => out.liquid = true,
                '=' | '_' | '>' | '<' => out.partial = true,
                ' ' => {}
                other => out.unknown.push(other),
            }
        }
        out.slope = kind.map(|kind| Slope { kind, half });

        if !out.unknown.is_empty() {
            warn!(code, unknown = ?out.unknown, "unknown collision glyph; tile treated as non-solid");
            return CollisionCode { unknown: out.unknown, ..CollisionCode::default() };
        }
        out
    }

    /// Can this code ever block motion?
    pub fn is_solid(&self) -> bool {
        self.solid_box || self.slope.is_some() || self.one_way || self.partial
    }
}

// ══════════════════════════════════════════════════════════════
// Contact resolution
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Axis {
    X,
    Y,
}

/// One sample point's approach into one tile.
#[derive(Clone, Copy, Debug)]
pub struct ContactQuery {
    pub axis: Axis,
    /// Signed displacement along `axis` this sweep. Zero never contacts.
    pub velocity: f32,
    /// Sample position inside the tile, `[0, tile_size)` on both axes.
    pub offset: (f32, f32),
    pub tile_size: f32,
    /// Sample is one of the two bottom anchors.
    pub feet: bool,
    pub climbing: bool,
    /// Tile came from the overlay layer.
    pub overlay: bool,
    /// Liquid contact here is lethal (tile index in the configured range).
    pub lethal_liquid: bool,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Contact {
    Clear,
    /// Blocked by an axis-aligned face at tile-local coordinate `at`
    /// along the query axis.
    Edge(f32),
    /// On the solid side of a slope; the surface is at tile-local y.
    Slope { surface: f32, half: SlopeHalf },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SideEffect {
    Swim,
    Lethal,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CodeOutcome {
    pub contact: Contact,
    pub side_effect: Option<SideEffect>,
    /// Maximum fall speed that still lands on an inset partial box next tick.
    pub fall_cap: Option<f32>,
}

impl CodeOutcome {
    pub const CLEAR: CodeOutcome = CodeOutcome { contact: Contact::Clear, side_effect: None, fall_cap: None };

    fn contact(contact: Contact) -> Self {
        CodeOutcome { contact, ..Self::CLEAR }
    }

    pub fn blocks(&self) -> bool {
        self.contact != Contact::Clear
    }

    /// Distance the sample must travel against its approach to sit flush.
    pub fn penetration(&self, query: &ContactQuery) -> f32 {
        let along = match query.axis {
            Axis::X => query.offset.0,
            Axis::Y => query.offset.1,
        };
        match self.contact {
            Contact::Clear => 0.0,
            Contact::Edge(at) if query.velocity > 0.0 => along - at,
            Contact::Edge(at) => at - along,
            Contact::Slope { surface, half: SlopeHalf::Lower } => query.offset.1 - surface,
            Contact::Slope { surface, half: SlopeHalf::Upper } => surface - query.offset.1,
        }
    }
}

/// Resolve one sample against one tile's collision code.
pub fn resolve_code(code: &CollisionCode, partial: PartialBox, q: &ContactQuery) -> CodeOutcome {
    if code.liquid {
        let effect = if q.lethal_liquid { SideEffect::Lethal } else { SideEffect::Swim };
        return CodeOutcome { side_effect: Some(effect), ..CodeOutcome::CLEAR };
    }
    if !code.is_solid() || q.velocity == 0.0 {
        return CodeOutcome::CLEAR;
    }

    let t = q.tile_size;
    let (ox, oy) = q.offset;

    if let Some(slope) = code.slope {
        let face = q.axis == Axis::X && slope.vertical_face(q.velocity);
        if !face {
            if let Some(half) = slope.half {
                // Overlay slopes are scenery.
                if q.overlay {
                    return CodeOutcome::CLEAR;
                }
                let surface = slope.surface_at(ox, t);
                let offset = oy - surface;
                let moving_down = q.axis == Axis::Y && q.velocity > 0.0;
                let moving_up = q.axis == Axis::Y && q.velocity < 0.0;
                match half {
                    SlopeHalf::Lower if offset <= 0.0 => return CodeOutcome::CLEAR,
                    SlopeHalf::Upper if offset >= 0.0 => return CodeOutcome::CLEAR,
                    // Hitting the flat underside / top face: fall through to the box.
                    SlopeHalf::Lower if moving_up => {}
                    SlopeHalf::Upper if moving_down => {}
                    // Sideways into the diagonal: the face is the line's x at this height.
                    _ if q.axis == Axis::X => return CodeOutcome::contact(Contact::Edge(slope.line_x(oy, t))),
                    _ => return CodeOutcome::contact(Contact::Slope { surface, half }),
                }
            }
        }
    }

    if code.one_way && !code.solid_box && code.slope.is_none() {
        let landing = q.axis == Axis::Y
            && q.velocity > 0.0
            && q.feet
            && !q.climbing
            && oy - q.velocity <= 1.0;
        return if landing { CodeOutcome::contact(Contact::Edge(0.0)) } else { CodeOutcome::CLEAR };
    }

    let (x0, x1) = if code.partial { partial.x_span(t) } else { (0.0, t) };
    let (y0, y1) = if code.partial { partial.y_span(t) } else { (0.0, t) };

    let inside = x0 <= ox && ox < x1 && y0 <= oy && oy < y1;
    if !inside {
        // Falling fast through the empty inset above a slab: cap the speed so
        // the next tick cannot step over the slab.
        let fall_cap = (q.axis == Axis::Y && q.velocity > 4.0 && oy < y0 && x0 <= ox && ox < x1)
            .then_some(y0 - oy);
        return CodeOutcome { fall_cap, ..CodeOutcome::CLEAR };
    }

    let at = match (q.axis, q.velocity > 0.0) {
        (Axis::X, true) => x0,
        (Axis::X, false) => x1,
        (Axis::Y, true) => y0,
        (Axis::Y, false) => y1,
    };
    CodeOutcome::contact(Contact::Edge(at))
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: f32 = 32.0;

    fn query(axis: Axis, velocity: f32, ox: f32, oy: f32, feet: bool) -> ContactQuery {
        ContactQuery {
            axis,
            velocity,
            offset: (ox, oy),
            tile_size: T,
            feet,
            climbing: false,
            overlay: false,
            lethal_liquid: false,
        }
    }

    fn resolve(code: &str, q: &ContactQuery) -> CodeOutcome {
        resolve_code(&CollisionCode::parse(code), PartialBox::default(), q)
    }

    // ── parse ──

    #[test]
    fn parse_composes_traits() {
        let c = CollisionCode::parse("/1");
        assert_eq!(c.slope, Some(Slope { kind: SlopeKind::Rising, half: Some(SlopeHalf::Lower) }));
        assert!(c.is_solid());

        let c = CollisionCode::parse("~_");
        assert!(c.liquid);
        assert!(c.partial);
    }

    #[test]
    fn unknown_glyph_degrades_to_non_solid() {
        let c = CollisionCode::parse("#?");
        assert!(!c.is_solid());
        assert!(!c.solid_box);
        assert_eq!(c.unknown, vec!['?']);
    }

    #[test]
    fn empty_code_is_air() {
        assert!(!CollisionCode::parse("").is_solid());
    }

    // ── solid box ──

    #[test]
    fn box_blocks_each_approach_at_the_facing_edge() {
        let down = query(Axis::Y, 5.0, 10.0, 4.0, true);
        let o = resolve("#", &down);
        assert_eq!(o.contact, Contact::Edge(0.0));
        assert_eq!(o.penetration(&down), 4.0);

        let up = query(Axis::Y, -5.0, 10.0, 28.0, false);
        let o = resolve("#", &up);
        assert_eq!(o.contact, Contact::Edge(T));
        assert_eq!(o.penetration(&up), 4.0);

        let left = query(Axis::X, -3.0, 30.0, 10.0, false);
        assert_eq!(resolve("|", &left).penetration(&left), 2.0);
    }

    #[test]
    fn zero_velocity_never_contacts() {
        assert!(!resolve("#", &query(Axis::X, 0.0, 5.0, 5.0, false)).blocks());
    }

    // ── slopes ──

    #[test]
    fn rising_slope_surface_follows_line() {
        // `/`: m = -1, c = tile
        for x in [0.0, 16.0, 31.0] {
            let q = query(Axis::Y, 2.0, x, 31.5, true);
            let o = resolve("/1", &q);
            if x == 0.0 {
                // Sample sits above the surface at the bottom-left corner.
                assert!(!o.blocks());
            } else {
                assert_eq!(o.contact, Contact::Slope { surface: T - x, half: SlopeHalf::Lower });
                assert_eq!(o.penetration(&q), 31.5 - (T - x));
            }
        }
    }

    #[test]
    fn slope_above_surface_is_clear() {
        assert!(!resolve("/1", &query(Axis::Y, 3.0, 16.0, 10.0, true)).blocks());
        assert!(!resolve("\\1", &query(Axis::Y, 3.0, 16.0, 10.0, true)).blocks());
    }

    #[test]
    fn slope_vertical_face_blocks_as_box() {
        // Walking left into the tall right side of `/1`.
        let o = resolve("/1", &query(Axis::X, -2.0, 30.0, 20.0, false));
        assert_eq!(o.contact, Contact::Edge(T));
        // Walking right into the diagonal meets it at the line's x.
        let q = query(Axis::X, 2.0, 20.0, 20.0, false);
        let o = resolve("/1", &q);
        assert_eq!(o.contact, Contact::Edge(12.0));
        assert_eq!(o.penetration(&q), 8.0);
    }

    #[test]
    fn upper_half_slope_only_blocks_below_line_from_under() {
        // `\0`: solid above the line y = x.
        let q = query(Axis::Y, -4.0, 20.0, 10.0, false);
        let o = resolve("\\0", &q);
        assert_eq!(o.contact, Contact::Slope { surface: 20.0, half: SlopeHalf::Upper });
        assert_eq!(o.penetration(&q), 10.0);
        assert!(!resolve("\\0", &query(Axis::Y, -4.0, 10.0, 20.0, false)).blocks());
    }

    #[test]
    fn lower_slope_from_below_is_flat_underside() {
        let o = resolve("/1", &query(Axis::Y, -4.0, 20.0, 30.0, false));
        assert_eq!(o.contact, Contact::Edge(T));
    }

    #[test]
    fn overlay_slope_is_scenery() {
        let mut q = query(Axis::Y, 2.0, 20.0, 30.0, true);
        q.overlay = true;
        assert!(!resolve("/1", &q).blocks());
    }

    #[test]
    fn slope_without_half_is_box() {
        assert_eq!(resolve("/", &query(Axis::Y, 2.0, 1.0, 1.0, true)).contact, Contact::Edge(0.0));
    }

    // ── one-way ──

    #[test]
    fn one_way_never_blocks_upward() {
        assert!(!resolve("-", &query(Axis::Y, -6.0, 10.0, 0.5, false)).blocks());
        assert!(!resolve("-", &query(Axis::Y, -6.0, 10.0, 0.5, true)).blocks());
    }

    #[test]
    fn one_way_blocks_feet_landing_from_above() {
        // Previous penetration 0.9 - 0.9 = 0 <= 1.
        let o = resolve("-", &query(Axis::Y, 0.9, 10.0, 0.9, true));
        assert_eq!(o.contact, Contact::Edge(0.0));
        // Previous penetration exactly 1.
        assert!(resolve("-", &query(Axis::Y, 3.0, 10.0, 4.0, true)).blocks());
    }

    #[test]
    fn one_way_ignores_actor_already_below_surface() {
        assert!(!resolve("-", &query(Axis::Y, 2.0, 10.0, 8.0, true)).blocks());
        assert!(!resolve("-", &query(Axis::Y, 2.0, 10.0, 1.0, false)).blocks());
        assert!(!resolve("-", &query(Axis::X, 2.0, 10.0, 1.0, true)).blocks());
    }

    #[test]
    fn one_way_ignores_climbers() {
        let mut q = query(Axis::Y, 1.0, 10.0, 1.0, true);
        q.climbing = true;
        assert!(!resolve("-", &q).blocks());
    }

    // ── liquids ──

    #[test]
    fn liquid_never_blocks_and_signals_swim() {
        let o = resolve("~", &query(Axis::Y, 5.0, 10.0, 10.0, true));
        assert!(!o.blocks());
        assert_eq!(o.side_effect, Some(SideEffect::Swim));
    }

    #[test]
    fn lethal_liquid_signals_lethal() {
        let mut q = query(Axis::X, 1.0, 10.0, 10.0, false);
        q.lethal_liquid = true;
        assert_eq!(resolve("~", &q).side_effect, Some(SideEffect::Lethal));
    }

    // ── partial boxes ──

    #[test]
    fn partial_top_inset_lands_on_inset_surface() {
        let slab = PartialBox { width: 0.0, height: -20.0 };
        let code = CollisionCode::parse("_");
        let q = query(Axis::Y, 3.0, 10.0, 22.0, true);
        let o = resolve_code(&code, slab, &q);
        assert_eq!(o.contact, Contact::Edge(20.0));
        assert_eq!(o.penetration(&q), 2.0);
    }

    #[test]
    fn partial_inset_region_is_clear_and_caps_fast_fall() {
        let slab = PartialBox { width: 0.0, height: -20.0 };
        let code = CollisionCode::parse("_");
        let o = resolve_code(&code, slab, &query(Axis::Y, 12.0, 10.0, 5.0, true));
        assert!(!o.blocks());
        assert_eq!(o.fall_cap, Some(15.0));
        // Slow falls are not capped.
        assert_eq!(resolve_code(&code, slab, &query(Axis::Y, 2.0, 10.0, 5.0, true)).fall_cap, None);
    }

    #[test]
    fn partial_width_sign_selects_inset_edge() {
        let left_inset = PartialBox { width: -12.0, height: 0.0 };
        let code = CollisionCode::parse(">");
        assert!(!resolve_code(&code, left_inset, &query(Axis::X, 2.0, 5.0, 10.0, false)).blocks());
        let o = resolve_code(&code, left_inset, &query(Axis::X, 2.0, 14.0, 10.0, false));
        assert_eq!(o.contact, Contact::Edge(12.0));

        let right_inset = PartialBox { width: 12.0, height: 0.0 };
        let code = CollisionCode::parse("<");
        assert!(!resolve_code(&code, right_inset, &query(Axis::X, -2.0, 20.0, 10.0, false)).blocks());
        let o = resolve_code(&code, right_inset, &query(Axis::X, -2.0, 8.0, 10.0, false));
        assert_eq!(o.contact, Contact::Edge(12.0));
    }
}
