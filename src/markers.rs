use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use carta_image::{Color, ImageSurface, MemoryImage};
use carta_proj::{Cube, Point2, Point3, MAP_X, MAP_Y, MAP_Z};
use carta_world::{SignText, WorldInfo};
use serde::Serialize;

use crate::cli::Settings;
use crate::error::Error;
use crate::font::FontFace;
use crate::players::NamedPos;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerKind {
    Player,
    Sign,
    Coord,
    Warp,
}

impl MarkerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkerKind::Player => "player",
            MarkerKind::Sign => "sign",
            MarkerKind::Coord => "coord",
            MarkerKind::Warp => "warp",
        }
    }
}

/// A labeled point of interest in world block coordinates.
#[derive(Clone, Debug)]
pub struct Marker {
    pub text: String,
    pub kind: MarkerKind,
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

/// Collect every enabled marker source: players, chunk signs, chunk
/// coordinates, warps. Position filters match the original tool: players
/// and warps must fall inside the world's chunk bounds, coordinate markers
/// keep four chunks of margin and a ten-chunk cadence.
pub fn build_markers(
    s: &Settings,
    world: &WorldInfo,
    signs: &[SignText],
    players: &[NamedPos],
    warps: &[NamedPos],
) -> Vec<Marker> {
    let mut markers = Vec::new();

    let in_world = |x: i64, z: i64| {
        let cx = x.div_euclid(MAP_X);
        let cz = z.div_euclid(MAP_Z);
        cx >= world.min_x && cx <= world.max_x && cz >= world.min_z && cz <= world.max_z
    };

    if s.show_players {
        for p in players {
            if !in_world(p.x, p.z) {
                continue;
            }
            markers.push(Marker {
                text: p.name.clone(),
                kind: MarkerKind::Player,
                x: p.x,
                y: p.y,
                z: p.z,
            });
        }
    }

    if s.show_signs {
        for sign in signs {
            if let Some(filter) = &s.show_signs_filter {
                if !sign.text.starts_with(filter.as_str()) {
                    continue;
                }
            }
            markers.push(Marker {
                text: sign.text.clone(),
                kind: MarkerKind::Sign,
                x: i64::from(sign.x),
                y: i64::from(sign.y),
                z: i64::from(sign.z),
            });
        }
    }

    if s.show_coordinates {
        for level in &world.levels {
            if level.x_pos % 10 != 0 || level.z_pos % 10 != 0 {
                continue;
            }
            if level.x_pos - 4 < world.min_x || level.x_pos + 4 > world.max_x {
                continue;
            }
            if level.z_pos - 4 < world.min_z || level.z_pos + 4 > world.max_z {
                continue;
            }
            markers.push(Marker {
                text: format!("({}, {})", level.x_pos * MAP_X, level.z_pos * MAP_Z),
                kind: MarkerKind::Coord,
                x: level.x_pos * MAP_X,
                y: 0,
                z: level.z_pos * MAP_Z,
            });
        }
    }

    if s.show_warps_path.is_some() {
        for w in warps {
            if !in_world(w.x, w.z) {
                continue;
            }
            markers.push(Marker {
                text: w.name.clone(),
                kind: MarkerKind::Warp,
                x: w.x,
                y: w.y,
                z: w.z,
            });
        }
    }

    markers
}

/// Project a marker to canvas pixels; overlay and export share this
/// arithmetic. Coordinate markers were laid down in rotated chunk space
/// already, so only player/sign/warp positions rotate here.
pub fn project_marker(s: &Settings, world: &WorldInfo, m: &Marker) -> Option<Point2> {
    let diffx = (world.max_x - world.min_x) * MAP_X;
    let diffz = (world.max_z - world.min_z) * MAP_Z;
    let cube = Cube::new(diffx + MAP_X, MAP_Y, diffz + MAP_Z);

    let (x, z) = match m.kind {
        MarkerKind::Coord => (m.x, m.z),
        _ => s.rotation.apply_block(m.x, m.z),
    };
    let pos = Point3::new(x - world.min_x * MAP_X, m.y, z - world.min_z * MAP_Z);
    cube.project(s.mode, pos)
}

/// Draw each marker: a 5x5 swatch of the category color at `(x-3, y-3)` and
/// the text at `(x+5, y)`.
pub fn overlay_markers(
    s: &Settings,
    world: &WorldInfo,
    img: &mut dyn ImageSurface,
    markers: &[Marker],
    font: &FontFace,
) {
    let category = |kind: MarkerKind| -> Color {
        let color = match kind {
            MarkerKind::Player => s.player_color,
            MarkerKind::Sign => s.sign_color,
            MarkerKind::Coord => s.coordinate_color,
            MarkerKind::Warp => s.warp_color,
        };
        color.unwrap_or(s.ttf_color)
    };

    for m in markers {
        let Some(at) = project_marker(s, world, m) else {
            continue;
        };
        let color = category(m.kind);
        let mut mark = MemoryImage::new(5, 5);
        mark.fill(color);
        img.safe_composite(at.x - 3, at.y - 3, &mut mark);
        font.with_color(color).draw(img, &m.text, at.x + 5, at.y);
    }
}

#[derive(Serialize)]
struct MarkerRecord<'a> {
    text: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    x: i64,
    y: i64,
    #[serde(rename = "X")]
    world_x: i64,
    #[serde(rename = "Y")]
    world_y: i64,
    #[serde(rename = "Z")]
    world_z: i64,
}

/// Serialize markers as a JSON array; lowercase fields are projected pixel
/// coordinates, uppercase the world position.
pub fn export_markers(
    path: &Path,
    s: &Settings,
    world: &WorldInfo,
    markers: &[Marker],
) -> Result<(), Error> {
    let mut records = Vec::with_capacity(markers.len());
    for m in markers {
        let Some(at) = project_marker(s, world, m) else {
            continue;
        };
        records.push(MarkerRecord {
            text: &m.text,
            kind: m.kind.as_str(),
            x: at.x,
            y: at.y,
            world_x: m.x,
            world_y: m.y,
            world_z: m.z,
        });
    }
    let out = BufWriter::new(File::create(path)?);
    serde_json::to_writer(out, &records)
        .map_err(|e| Error::Io(format!("writing markers to {}: {}", path.display(), e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use carta_world::Level;

    fn test_world() -> WorldInfo {
        WorldInfo {
            min_x: -1,
            max_x: 1,
            min_z: -1,
            max_z: 1,
            levels: vec![Level {
                x_pos: 0,
                z_pos: 0,
                path: std::path::PathBuf::from("c.0.0.vxc"),
            }],
            chunk_x: 0,
            chunk_y: 0,
        }
    }

    #[test]
    fn top_mode_marker_projection() {
        let s = Settings::default();
        let world = test_world();
        let m = Marker {
            text: "spawn".into(),
            kind: MarkerKind::Warp,
            x: 5,
            y: 64,
            z: -3,
        };
        // Canvas origin is chunk (-1, -1): pixel = (5 + 16, -3 + 16).
        let at = project_marker(&s, &world, &m).unwrap();
        assert_eq!(at, Point2::new(21, 13));
    }

    #[test]
    fn players_outside_the_world_are_dropped() {
        let s = Settings {
            show_players: true,
            ..Settings::default()
        };
        let world = test_world();
        let players = vec![
            NamedPos {
                name: "inside".into(),
                x: 0,
                y: 64,
                z: 0,
            },
            NamedPos {
                name: "outside".into(),
                x: 500,
                y: 64,
                z: 0,
            },
        ];
        let markers = build_markers(&s, &world, &[], &players, &[]);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].text, "inside");
    }

    #[test]
    fn sign_prefix_filter() {
        let s = Settings {
            show_signs: true,
            show_signs_filter: Some("[home]".into()),
            ..Settings::default()
        };
        let world = test_world();
        let signs = vec![
            SignText {
                x: 0,
                y: 64,
                z: 0,
                text: "[home] base".into(),
            },
            SignText {
                x: 1,
                y: 64,
                z: 0,
                text: "keep out".into(),
            },
        ];
        let markers = build_markers(&s, &world, &signs, &[], &[]);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].text, "[home] base");
    }

    #[test]
    fn export_and_overlay_agree_on_pixels() {
        let path = std::env::temp_dir().join(format!("carta-markers-{}.json", std::process::id()));
        let s = Settings::default();
        let world = test_world();
        let markers = vec![Marker {
            text: "spot".into(),
            kind: MarkerKind::Sign,
            x: 10,
            y: 70,
            z: 12,
        }];
        export_markers(&path, &s, &world, &markers).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let at = project_marker(&s, &world, &markers[0]).unwrap();
        assert_eq!(json[0]["x"].as_i64().unwrap(), at.x);
        assert_eq!(json[0]["y"].as_i64().unwrap(), at.y);
        assert_eq!(json[0]["X"].as_i64().unwrap(), 10);
        assert_eq!(json[0]["type"].as_str().unwrap(), "sign");
        std::fs::remove_file(path).unwrap();
    }
}
