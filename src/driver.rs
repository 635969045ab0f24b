use std::path::{Path, PathBuf};
use std::sync::Arc;

use carta_blocks::MaterialTable;
use carta_image::{
    split_rects, CachedImage, ImageOperations, ImageSurface, MemoryImage, VirtualImage,
};
use carta_pool::WorkerPool;
use carta_proj::{Cube, Point3, MAP_X, MAP_Y, MAP_Z};
use carta_render::render_chunk;
use carta_world::{decode_chunk, Level, ParseError, SignText, WorldInfo};

use crate::cli::Settings;
use crate::error::Error;
use crate::font::FontFace;
use crate::markers::{build_markers, export_markers, overlay_markers};
use crate::players::{load_players, load_warps, NamedPos};
use crate::progress::Progress;

const PNG_TITLE: &str = "Map generated by carta";

/// What one worker hands back for one chunk.
struct RenderOut {
    x_pos: i64,
    z_pos: i64,
    result: Result<(ImageOperations, Vec<SignText>), ParseError>,
}

/// Substitute tile coordinates into an output template holding two `%d`
/// specifiers.
fn format_output(template: &str, x: i64, y: i64) -> Result<String, Error> {
    let mut out = String::with_capacity(template.len() + 8);
    let mut rest = template;
    for value in [x, y] {
        match rest.split_once("%d") {
            Some((head, tail)) => {
                out.push_str(head);
                out.push_str(&value.to_string());
                rest = tail;
            }
            None => {
                return Err(Error::Config(
                    "The `-o' parameter must contain two number format specifiers `%d' \
                     (x and y coordinates) - example: -o out/base.%d.%d.png"
                        .to_string(),
                ))
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Validate inputs, scan the world, and render it — as one image or as one
/// image per split tile.
pub fn do_world(s: &Settings, progress: &Progress) -> Result<(), Error> {
    let world_path = s
        .world_path
        .as_deref()
        .ok_or_else(|| Error::Config("You must specify a world directory using `-w'".into()))?;

    if s.split.is_some() || s.pixelsplit.is_some() {
        format_output(&s.output_path, 0, 0)?;
    }

    if !s.nocheck {
        let manifest = world_path.join("level.dat");
        if !manifest.exists() {
            return Err(Error::World(format!("Does not exist: {}", manifest.display())));
        }
        if s.output_path != "-" {
            let parent = Path::new(&s.output_path)
                .parent()
                .map(Path::to_path_buf)
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from("."));
            if !parent.is_dir() {
                return Err(Error::World(format!(
                    "Output directory does not exist: {}",
                    parent.display()
                )));
            }
        }
    }

    let players = if s.show_players {
        load_players(&world_path.join("players"), &s.show_players_set)
    } else {
        Vec::new()
    };
    let warps = match &s.show_warps_path {
        Some(path) => load_warps(path)
            .map_err(|e| Error::Io(format!("warps file {}: {}", path.display(), e)))?,
        None => Vec::new(),
    };

    progress.note(&format!("Working on {} thread(s)...", s.threads));
    progress.note("Performing broad phase scan of world directory...");
    let world = WorldInfo::scan(world_path, &s.scan_options(), &mut |i| {
        progress.parse_tick(i)
    })?;
    progress.parse_done();
    progress.note(&format!("found {} chunk files", world.levels.len()));

    let materials = Arc::new(s.materials.clone());

    match s.split {
        Some(n) => {
            for tile in world.split(n) {
                let output = format_output(&s.output_path, tile.chunk_x, tile.chunk_y)?;
                render_world(s, &materials, &tile, &players, &warps, &output, progress)?;
            }
            Ok(())
        }
        None => render_world(
            s,
            &materials,
            &world,
            &players,
            &warps,
            &s.output_path,
            progress,
        ),
    }
}

/// Render one world (or one split tile) to `output`.
fn render_world(
    s: &Settings,
    materials: &Arc<MaterialTable>,
    world: &WorldInfo,
    players: &[NamedPos],
    warps: &[NamedPos],
    output: &str,
    progress: &Progress,
) -> Result<(), Error> {
    log::debug!(
        "world bounds x: {}..{} z: {}..{}, {} chunks, tile {}x{}",
        world.min_x,
        world.max_x,
        world.min_z,
        world.max_z,
        world.levels.len(),
        world.chunk_x,
        world.chunk_y
    );

    let diffx = world.max_x - world.min_x;
    let diffz = world.max_z - world.min_z;
    let canvas = Cube::new((diffx + 1) * MAP_X, MAP_Y, (diffz + 1) * MAP_Z);
    let (width, height) = canvas.dimensions(s.mode);
    if width <= 0 || height <= 0 {
        return Err(Error::Render(format!(
            "empty canvas {}x{} for world bounds",
            width, height
        )));
    }

    let footprint = (width * height * 4) as u64;
    let mut surface: Box<dyn ImageSurface> = if footprint > s.memory_limit {
        progress.note(&format!(
            "{}: {}x{} ~{:.1} MB (cached at {})...",
            output,
            width,
            height,
            footprint as f64 / 1_000_000.0,
            s.cache_file.display()
        ));
        let capacity = (s.memory_limit as usize / CachedImage::ENTRY_SIZE).max(1);
        let cached = CachedImage::build(&s.cache_file, width, height, capacity)
            .map_err(|e| Error::Io(format!("{}: {}", e, s.cache_file.display())))?;
        Box::new(cached)
    } else {
        progress.note(&format!(
            "{}: {}x{} ~{:.1} MB...",
            output,
            width,
            height,
            footprint as f64 / 1_000_000.0
        ));
        Box::new(MemoryImage::new(width, height))
    };

    let render_settings = s.render_settings();
    let worker_materials = Arc::clone(materials);
    let mut pool = WorkerPool::new(s.threads, move |level: Level| {
        let result = decode_chunk(&level.path)
            .map(|chunk| (render_chunk(&chunk, &worker_materials, &render_settings), chunk.signs));
        RenderOut {
            x_pos: level.x_pos,
            z_pos: level.z_pos,
            result,
        }
    });

    let offset_cube = Cube::new(diffx * MAP_X, MAP_Y, diffz * MAP_Z);
    let total = world.levels.len();
    let inflight_bound = (s.threads * 4) as u64;
    let mut feed = world.levels.iter();
    let mut signs: Vec<SignText> = Vec::new();
    let mut fatal: Option<Error> = None;

    for i in 0..total {
        while pool.outstanding() < inflight_bound {
            match feed.next() {
                Some(level) => pool.give(level.clone()),
                None => break,
            }
        }

        let out = pool.get();
        let (ops, mut chunk_signs) = match out.result {
            Ok(r) => r,
            Err(e) if s.require_all => {
                fatal = Some(Error::Parse(e));
                break;
            }
            Err(e) => {
                log::warn!("ignoring unparsable chunk file: {}", e);
                continue;
            }
        };

        progress.render_tick(i, total);
        signs.append(&mut chunk_signs);

        let pos = Point3::new(
            (out.x_pos - world.min_x) * MAP_X,
            MAP_Y,
            (out.z_pos - world.min_z) * MAP_Z,
        );
        let at = match offset_cube.project(s.mode, pos) {
            Some(at) => at,
            None => {
                fatal = Some(Error::Render(format!(
                    "chunk offset projection failed at {:?}",
                    pos
                )));
                break;
            }
        };
        surface.composite_ops(at.x, at.y, &ops);
        progress.composite_tick(i, total);
    }
    progress.render_tick(total, total);
    progress.composite_tick(total, total);
    pool.join();
    if let Some(e) = fatal {
        return Err(e);
    }

    let markers = build_markers(s, world, &signs, players, warps);
    if let Some(path) = &s.write_markers_path {
        export_markers(path, s, world, &markers)?;
    } else if s.show_markers() {
        let font = FontFace::open(&s.ttf_path, s.ttf_size, s.ttf_color)?;
        overlay_markers(s, world, surface.as_mut(), &markers, &font);
    }

    progress.note("Saving image...");
    let mut on_row = |row: usize, rows: usize| progress.image_tick(row, rows);
    match s.pixelsplit {
        Some(pixels) => {
            for ((tx, ty), rect) in split_rects(width, height, pixels) {
                let name = format_output(output, tx, ty)?;
                let mut view = VirtualImage::new(surface.as_mut(), rect);
                view.save_png(Path::new(&name), Some(PNG_TITLE), &mut on_row)?;
            }
        }
        None => {
            surface.save_png(Path::new(output), Some(PNG_TITLE), &mut on_row)?;
        }
    }
    Ok(())
}
