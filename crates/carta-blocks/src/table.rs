use carta_image::Color;

/// Size of the dense block-id space.
pub const MATERIAL_COUNT: usize = 256;

/// Block id of air; always skipped by the renderer.
pub const AIR: u8 = 0;

/// Default delta between a base color and its derived side color.
pub const SIDE_DARKEN: u8 = 0x20;

#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    pub base: Color,
    pub side: Color,
    /// Cleared by exclusion flags; an undrawn block is treated as air.
    pub drawn: bool,
}

impl Material {
    fn named(name: &str, base: Color) -> Self {
        let mut side = base;
        side.darken(SIDE_DARKEN);
        Self {
            name: name.to_string(),
            base,
            side,
            drawn: true,
        }
    }

    fn placeholder(id: usize) -> Self {
        Material {
            name: format!("block.{}", id),
            base: Color::INVISIBLE,
            side: Color::INVISIBLE,
            drawn: true,
        }
    }
}

/// The process-scoped material table, indexed by block id. Built once at
/// startup (defaults, palette file, CLI overrides, exclusions) and read-only
/// during rendering.
#[derive(Clone, Debug)]
pub struct MaterialTable {
    materials: Vec<Material>,
}

impl Default for MaterialTable {
    fn default() -> Self {
        let mut materials: Vec<Material> = (0..MATERIAL_COUNT).map(Material::placeholder).collect();
        for (id, name, color) in DEFAULT_MATERIALS {
            materials[*id as usize] = Material::named(name, *color);
        }
        // Side colors with their own defaults rather than the darkened base.
        materials[GRASS as usize].side = Color::opaque(0x6b, 0x49, 0x30);
        Self { materials }
    }
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, id: u8) -> &Material {
        &self.materials[id as usize]
    }

    pub fn id_by_name(&self, name: &str) -> Option<u8> {
        self.materials
            .iter()
            .position(|m| m.name == name)
            .map(|i| i as u8)
    }

    /// Set a base color; the side color becomes the darkened base.
    pub fn set_base(&mut self, id: u8, c: Color) {
        let m = &mut self.materials[id as usize];
        m.base = c;
        m.side = c;
        m.side.darken(SIDE_DARKEN);
    }

    pub fn set_side(&mut self, id: u8, c: Color) {
        self.materials[id as usize].side = c;
    }

    pub fn hide(&mut self, id: u8) {
        self.materials[id as usize].drawn = false;
    }

    pub fn show(&mut self, id: u8) {
        self.materials[id as usize].drawn = true;
    }

    pub fn hide_all(&mut self) {
        for m in &mut self.materials {
            m.drawn = false;
        }
    }

    /// Force every non-air material opaque (`--no-alpha`).
    pub fn make_opaque(&mut self) {
        for (id, m) in self.materials.iter_mut().enumerate() {
            if id as u8 == AIR {
                continue;
            }
            if !m.base.is_invisible() {
                m.base.a = 0xff;
            }
            if !m.side.is_invisible() {
                m.side.a = 0xff;
            }
        }
    }

    /// The renderer-facing exclusion view: true means skip the block.
    pub fn excludes(&self) -> [bool; MATERIAL_COUNT] {
        let mut out = [false; MATERIAL_COUNT];
        for (i, m) in self.materials.iter().enumerate() {
            out[i] = !m.drawn;
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Material)> {
        self.materials.iter().enumerate().map(|(i, m)| (i as u8, m))
    }
}

const GRASS: u8 = 2;

/// The default material set. Side colors derive from the base darkened by
/// [`SIDE_DARKEN`] unless adjusted after construction.
const DEFAULT_MATERIALS: &[(u8, &str, Color)] = &[
    (0, "Air", Color::new(0, 0, 0, 0)),
    (1, "Stone", Color::opaque(0x80, 0x80, 0x80)),
    (2, "Grass", Color::opaque(0x4c, 0x83, 0x39)),
    (3, "Dirt", Color::opaque(0x96, 0x67, 0x43)),
    (4, "Cobblestone", Color::opaque(0x75, 0x75, 0x75)),
    (5, "Wood", Color::opaque(0x9d, 0x80, 0x4f)),
    (6, "Sapling", Color::new(0x50, 0x8c, 0x3c, 0x60)),
    (7, "Bedrock", Color::opaque(0x33, 0x33, 0x33)),
    (8, "Water", Color::new(0x16, 0x2c, 0x99, 0x70)),
    (9, "StationaryWater", Color::new(0x16, 0x2c, 0x99, 0x70)),
    (10, "Lava", Color::opaque(0xe2, 0x58, 0x22)),
    (11, "StationaryLava", Color::opaque(0xe2, 0x58, 0x22)),
    (12, "Sand", Color::opaque(0xda, 0xd2, 0x9e)),
    (13, "Gravel", Color::opaque(0x88, 0x82, 0x7d)),
    (14, "GoldOre", Color::opaque(0xb5, 0xa7, 0x47)),
    (15, "IronOre", Color::opaque(0x97, 0x82, 0x6e)),
    (16, "CoalOre", Color::opaque(0x45, 0x45, 0x45)),
    (17, "Log", Color::opaque(0x67, 0x50, 0x31)),
    (18, "Leaves", Color::new(0x30, 0x66, 0x17, 0x9d)),
    (19, "Sponge", Color::opaque(0xc3, 0xc3, 0x4c)),
    (20, "Glass", Color::new(0xff, 0xff, 0xff, 0x30)),
    (24, "Sandstone", Color::opaque(0xd5, 0xcd, 0x94)),
    (35, "Wool", Color::opaque(0xde, 0xde, 0xde)),
    (37, "YellowFlower", Color::new(0xf1, 0xf9, 0x02, 0x80)),
    (38, "RedRose", Color::new(0xf7, 0x07, 0x07, 0x80)),
    (41, "GoldBlock", Color::opaque(0xfc, 0xee, 0x4b)),
    (42, "IronBlock", Color::opaque(0xd9, 0xd9, 0xd9)),
    (43, "DoubleSlab", Color::opaque(0xa8, 0xa8, 0xa8)),
    (44, "Slab", Color::opaque(0xa8, 0xa8, 0xa8)),
    (45, "Brick", Color::opaque(0x96, 0x4d, 0x41)),
    (46, "TNT", Color::opaque(0xdb, 0x44, 0x17)),
    (48, "MossyCobblestone", Color::opaque(0x60, 0x77, 0x53)),
    (49, "Obsidian", Color::opaque(0x11, 0x0d, 0x1a)),
    (50, "Torch", Color::new(0xff, 0xe1, 0x60, 0xd0)),
    (51, "Fire", Color::new(0xe0, 0xae, 0x15, 0xb0)),
    (52, "MobSpawner", Color::new(0x1b, 0x2d, 0x3c, 0xa0)),
    (53, "WoodenStairs", Color::opaque(0x9d, 0x80, 0x4f)),
    (54, "Chest", Color::opaque(0xa0, 0x6b, 0x23)),
    (56, "DiamondOre", Color::opaque(0x81, 0xa9, 0xb8)),
    (57, "DiamondBlock", Color::opaque(0x7a, 0xd8, 0xe0)),
    (58, "Workbench", Color::opaque(0x7b, 0x5e, 0x2d)),
    (59, "Crops", Color::new(0x90, 0xbc, 0x27, 0x80)),
    (60, "Soil", Color::opaque(0x57, 0x38, 0x1e)),
    (61, "Furnace", Color::opaque(0x60, 0x60, 0x60)),
    (63, "SignPost", Color::new(0x9d, 0x80, 0x4f, 0x40)),
    (64, "WoodenDoor", Color::new(0x9d, 0x80, 0x4f, 0x80)),
    (65, "Ladder", Color::new(0x9d, 0x80, 0x4f, 0x60)),
    (66, "MinecartTracks", Color::new(0x78, 0x6f, 0x66, 0xa0)),
    (67, "CobblestoneStairs", Color::opaque(0x75, 0x75, 0x75)),
    (78, "Snow", Color::opaque(0xf0, 0xfa, 0xfa)),
    (79, "Ice", Color::new(0x7d, 0xad, 0xff, 0x90)),
    (80, "SnowBlock", Color::opaque(0xf0, 0xfa, 0xfa)),
    (81, "Cactus", Color::opaque(0x10, 0x77, 0x16)),
    (82, "Clay", Color::opaque(0x90, 0x98, 0xa8)),
    (83, "Reed", Color::new(0x79, 0xa8, 0x5c, 0xb0)),
    (86, "Pumpkin", Color::opaque(0xe3, 0x90, 0x1d)),
    (87, "Netherstone", Color::opaque(0x6f, 0x36, 0x34)),
    (88, "SlowSand", Color::opaque(0x55, 0x42, 0x34)),
    (89, "LightStone", Color::opaque(0xf1, 0xc8, 0x64)),
    (91, "Jackolantern", Color::opaque(0xe3, 0x90, 0x1d)),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_defaults_to_darkened_base() {
        let t = MaterialTable::new();
        let stone = t.get(1);
        let mut expect = stone.base;
        expect.darken(SIDE_DARKEN);
        assert_eq!(stone.side, expect);
    }

    #[test]
    fn lookup_by_name_and_override() {
        let mut t = MaterialTable::new();
        let id = t.id_by_name("Sand").unwrap();
        assert_eq!(id, 12);
        t.set_base(id, Color::opaque(1, 2, 3));
        assert_eq!(t.get(id).base, Color::opaque(1, 2, 3));
        let mut side = Color::opaque(1, 2, 3);
        side.darken(SIDE_DARKEN);
        assert_eq!(t.get(id).side, side);
    }

    #[test]
    fn hide_all_then_include() {
        let mut t = MaterialTable::new();
        t.hide_all();
        t.show(1);
        let ex = t.excludes();
        assert!(!ex[1]);
        assert!(ex[2]);
    }
}
