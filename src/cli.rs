use std::collections::HashSet;
use std::path::PathBuf;

use carta_blocks::{parse_color_spec, MaterialTable, MATERIAL_COUNT};
use carta_image::Color;
use carta_proj::{Mode, Rotation};
use carta_render::RenderSettings;
use carta_world::{MAP_Y, ScanOptions};

use crate::error::Error;

const DEFAULT_MEMORY_LIMIT_MB: u64 = 1024;

/// Everything decided on the command line, plus the material table with
/// overrides and exclusions already applied.
pub struct Settings {
    pub world_path: Option<PathBuf>,
    pub output_path: String,

    pub silent: bool,
    pub binary: bool,
    pub debug: bool,
    pub nocheck: bool,
    pub require_all: bool,
    pub pedantic_broad_phase: bool,

    pub mode: Mode,
    pub rotation: Rotation,
    pub top: usize,
    pub bottom: usize,
    pub night: bool,
    pub heightmap: bool,
    pub cavemode: bool,
    pub striped: bool,

    pub min_x: i64,
    pub max_x: i64,
    pub min_z: i64,
    pub max_z: i64,

    pub memory_limit: u64,
    pub cache_file: PathBuf,
    pub threads: usize,
    pub split: Option<i64>,
    pub pixelsplit: Option<i64>,

    pub show_players: bool,
    pub show_players_set: HashSet<String>,
    pub show_signs: bool,
    pub show_signs_filter: Option<String>,
    pub show_coordinates: bool,
    pub show_warps_path: Option<PathBuf>,
    pub write_markers_path: Option<PathBuf>,

    pub ttf_path: PathBuf,
    pub ttf_size: f32,
    pub ttf_color: Color,
    pub sign_color: Option<Color>,
    pub player_color: Option<Color>,
    pub coordinate_color: Option<Color>,
    pub warp_color: Option<Color>,

    pub palette_read: Option<PathBuf>,
    pub palette_write: Option<PathBuf>,

    pub materials: MaterialTable,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            world_path: None,
            output_path: "out.png".to_string(),
            silent: false,
            binary: false,
            debug: false,
            nocheck: false,
            require_all: false,
            pedantic_broad_phase: false,
            mode: Mode::Top,
            rotation: Rotation::R0,
            top: MAP_Y - 1,
            bottom: 0,
            night: false,
            heightmap: false,
            cavemode: false,
            striped: false,
            min_x: i64::MIN,
            max_x: i64::MAX,
            min_z: i64::MIN,
            max_z: i64::MAX,
            memory_limit: DEFAULT_MEMORY_LIMIT_MB * 1024 * 1024,
            cache_file: PathBuf::from("cache.dat"),
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            split: None,
            pixelsplit: None,
            show_players: false,
            show_players_set: HashSet::new(),
            show_signs: false,
            show_signs_filter: None,
            show_coordinates: false,
            show_warps_path: None,
            write_markers_path: None,
            ttf_path: PathBuf::from("font.ttf"),
            ttf_size: 12.0,
            ttf_color: Color::opaque(0, 0, 0),
            sign_color: None,
            player_color: None,
            coordinate_color: None,
            warp_color: None,
            palette_read: None,
            palette_write: None,
            materials: MaterialTable::new(),
        }
    }
}

impl Settings {
    pub fn show_markers(&self) -> bool {
        self.show_players
            || self.show_signs
            || self.show_coordinates
            || self.show_warps_path.is_some()
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            mode: self.mode,
            top: self.top,
            bottom: self.bottom,
            night: self.night,
            heightmap: self.heightmap,
            cavemode: self.cavemode,
            striped: self.striped,
            rotation: self.rotation,
            excludes: self.materials.excludes(),
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            pedantic: self.pedantic_broad_phase,
            require_all: self.require_all,
            min_x: self.min_x,
            max_x: self.max_x,
            min_z: self.min_z,
            max_z: self.max_z,
            rotation: self.rotation,
        }
    }
}

/// What the invocation asks for.
pub enum Command {
    Help,
    Version,
    ListColors,
    Run(Box<Settings>),
}

fn config(msg: impl Into<String>) -> Error {
    Error::Config(msg.into())
}

fn resolve_blockid(materials: &MaterialTable, token: &str) -> Result<u8, Error> {
    if let Some(id) = materials.id_by_name(token) {
        return Ok(id);
    }
    let id: i64 = token
        .parse()
        .map_err(|_| config(format!("Cannot be converted to number: {}", token)))?;
    if !(0..MATERIAL_COUNT as i64).contains(&id) {
        return Err(config(format!("Not a valid blockid: {}", token)));
    }
    Ok(id as u8)
}

fn parse_color(value: &str) -> Result<Color, Error> {
    parse_color_spec(value).map_err(config)
}

/// `-B`/`-S` argument: `<block-id-or-name>=<R,G,B[,A]>`.
fn parse_set(materials: &MaterialTable, arg: &str) -> Result<(u8, Color), Error> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| config(format!("color set must be <blockid>=<color>, not `{}'", arg)))?;
    Ok((resolve_blockid(materials, key)?, parse_color(value)?))
}

/// `-L N,S,E,W` in chunk coordinates; south and west are positive.
fn parse_limits(s: &mut Settings, arg: &str) -> Result<(), Error> {
    let parts: Vec<&str> = arg.split(',').collect();
    if parts.len() != 4 {
        return Err(config("Limit argument must be of format: <N>,<S>,<E>,<W>"));
    }
    let mut v = [0i64; 4];
    for (i, p) in parts.iter().enumerate() {
        v[i] = p
            .trim()
            .parse()
            .map_err(|_| config(format!("Cannot be converted to number: {}", p)))?;
    }
    s.min_x = v[0];
    s.max_x = v[1];
    s.min_z = v[2];
    s.max_z = v[3];
    Ok(())
}

fn parse_list(arg: &str) -> Result<HashSet<String>, Error> {
    let set: HashSet<String> = arg
        .split(&[' ', '\t', '\n', '\r', ',', ':'][..])
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect();
    if set.is_empty() {
        return Err(config("List must specify items separated by comma `,'"));
    }
    Ok(set)
}

struct Args {
    inner: std::vec::IntoIter<String>,
}

impl Args {
    fn next(&mut self) -> Option<String> {
        self.inner.next()
    }

    fn value_for(&mut self, flag: &str) -> Result<String, Error> {
        self.next()
            .ok_or_else(|| config(format!("Option {} requires an argument", flag)))
    }
}

/// Parse the command line. Overrides are applied to the material table in
/// the order given; palette files are loaded later (they are I/O) but
/// exclusions are resolved here: `-e` excludes, `-a` hides everything, `-i`
/// re-includes and always wins.
pub fn parse(argv: Vec<String>) -> Result<Command, Error> {
    let mut s = Settings::default();
    let mut args = Args {
        inner: argv.into_iter(),
    };

    let mut hide_all = false;
    let mut excludes: Vec<u8> = Vec::new();
    let mut includes: Vec<u8> = Vec::new();

    while let Some(arg) = args.next() {
        // Long options accept both `--flag value` and `--flag=value`; the
        // optional-argument ones only the `=` form.
        let (flag, inline): (String, Option<String>) = if arg.starts_with("--") {
            match arg.split_once('=') {
                Some((f, v)) => (f.to_string(), Some(v.to_string())),
                None => (arg.clone(), None),
            }
        } else {
            (arg.clone(), None)
        };

        let value = |args: &mut Args| -> Result<String, Error> {
            match &inline {
                Some(v) => Ok(v.clone()),
                None => args.value_for(&flag),
            }
        };

        match flag.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-v" | "--version" => return Ok(Command::Version),
            "-l" | "--list-colors" => return Ok(Command::ListColors),

            "-w" | "--world" => s.world_path = Some(PathBuf::from(value(&mut args)?)),
            "-o" | "--output" => s.output_path = value(&mut args)?,

            "-s" | "--silent" => s.silent = true,
            "-x" | "--binary" => {
                s.silent = true;
                s.binary = true;
            }
            "-D" | "--debug" => s.debug = true,
            "-N" | "--no-check" => s.nocheck = true,
            "--require-all" => s.require_all = true,
            "--pedantic-broad-phase" => s.pedantic_broad_phase = true,

            "-q" | "--oblique" => s.mode = Mode::Oblique,
            "-y" | "--oblique-angle" => s.mode = Mode::ObliqueAngle,
            "-z" | "--isometric" => s.mode = Mode::Isometric,
            "-c" | "--cave-mode" => s.cavemode = true,
            "-n" | "--night" => s.night = true,
            "-H" | "--heightmap" => s.heightmap = true,
            "--striped-terrain" => s.striped = true,

            "-r" | "--rotate" => {
                let deg: i32 = value(&mut args)?
                    .parse()
                    .map_err(|_| config("Rotation must be a number of degrees"))?;
                s.rotation = Rotation::from_degrees(deg)
                    .ok_or_else(|| config("Rotation must be a multiple of 90 degrees"))?;
            }

            "-t" | "--top" => {
                let top: usize = value(&mut args)?
                    .parse()
                    .map_err(|_| config("Top limit must be a number"))?;
                if !(top > s.bottom && top < MAP_Y) {
                    return Err(config(format!(
                        "Top limit must be between `<bottom limit> - {}', not {}",
                        MAP_Y, top
                    )));
                }
                s.top = top;
            }
            "-b" | "--bottom" => {
                let bottom: i64 = value(&mut args)?
                    .parse()
                    .map_err(|_| config("Bottom limit must be a number"))?;
                if !(bottom >= 0 && (bottom as usize) < s.top) {
                    return Err(config(format!(
                        "Bottom limit must be between `0 - <top limit>', not {}",
                        bottom
                    )));
                }
                s.bottom = bottom as usize;
            }
            "-L" | "--limits" => parse_limits(&mut s, &value(&mut args)?)?,

            "-m" | "--threads" => {
                s.threads = value(&mut args)?
                    .parse()
                    .map_err(|_| config("Number of worker threads must be a number"))?;
                if s.threads == 0 {
                    return Err(config("Number of worker threads must be more than 0"));
                }
            }
            "-M" | "--memory-limit" => {
                let mb: u64 = value(&mut args)?
                    .parse()
                    .map_err(|_| config("Memory limit must be a number of megabytes"))?;
                s.memory_limit = mb * 1024 * 1024;
            }
            "-C" | "--cache-file" => s.cache_file = PathBuf::from(value(&mut args)?),

            "-p" | "--split" => {
                if s.pixelsplit.is_some() {
                    return Err(config(
                        "Both `split' and `pixelsplit' cannot be used at the same time",
                    ));
                }
                let n: i64 = value(&mut args)?
                    .parse()
                    .map_err(|_| config("split argument must be a number"))?;
                if n < 1 {
                    return Err(config("split argument must be greater or equal to one"));
                }
                s.split = Some(n);
            }
            "--pixelsplit" => {
                if s.split.is_some() {
                    return Err(config(
                        "Both `split' and `pixelsplit' cannot be used at the same time",
                    ));
                }
                let n: i64 = value(&mut args)?
                    .parse()
                    .map_err(|_| config("pixelsplit argument must be a number"))?;
                if n < 1 {
                    return Err(config("pixelsplit argument must be greater or equal to one"));
                }
                s.pixelsplit = Some(n);
            }

            "-e" | "--exclude" => excludes.push(resolve_blockid(&s.materials, &value(&mut args)?)?),
            "-i" | "--include" => includes.push(resolve_blockid(&s.materials, &value(&mut args)?)?),
            "-a" | "--hide-all" => hide_all = true,
            "--no-alpha" => s.materials.make_opaque(),

            "-B" => {
                let (id, c) = parse_set(&s.materials, &value(&mut args)?)?;
                s.materials.set_base(id, c);
            }
            "-S" => {
                let (id, c) = parse_set(&s.materials, &value(&mut args)?)?;
                s.materials.set_side(id, c);
            }
            "-P" => s.palette_read = Some(PathBuf::from(value(&mut args)?)),
            "-W" => s.palette_write = Some(PathBuf::from(value(&mut args)?)),

            "--show-players" => {
                s.show_players = true;
                if let Some(list) = &inline {
                    s.show_players_set = parse_list(list)?;
                }
            }
            "--show-signs" => {
                s.show_signs = true;
                if let Some(prefix) = &inline {
                    if prefix.is_empty() {
                        return Err(config("Sign filter must not be empty string"));
                    }
                    s.show_signs_filter = Some(prefix.clone());
                }
            }
            "--show-coordinates" => s.show_coordinates = true,
            "--show-warps" => {
                let path = PathBuf::from(value(&mut args)?);
                if !path.is_file() {
                    return Err(config(format!("Not a file: {}", path.display())));
                }
                s.show_warps_path = Some(path);
            }
            "--write-markers" => {
                let path = PathBuf::from(value(&mut args)?);
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.is_dir() {
                        return Err(config(format!("Not a directory: {}", parent.display())));
                    }
                }
                s.write_markers_path = Some(path);
            }

            "--ttf-path" => s.ttf_path = PathBuf::from(value(&mut args)?),
            "--ttf-size" => {
                s.ttf_size = value(&mut args)?
                    .parse()
                    .map_err(|_| config("ttf-size must be a number"))?;
                if s.ttf_size <= 0.0 {
                    return Err(config("ttf-size must be greater than 0"));
                }
            }
            "--ttf-color" => s.ttf_color = parse_color(&value(&mut args)?)?,
            "--sign-color" => s.sign_color = Some(parse_color(&value(&mut args)?)?),
            "--player-color" => s.player_color = Some(parse_color(&value(&mut args)?)?),
            "--coordinate-color" => s.coordinate_color = Some(parse_color(&value(&mut args)?)?),
            "--warp-color" => s.warp_color = Some(parse_color(&value(&mut args)?)?),

            other => return Err(config(format!("Unknown option `{}'", other))),
        }
    }

    if hide_all {
        s.materials.hide_all();
    }
    for id in excludes {
        s.materials.hide(id);
    }
    for id in includes {
        s.materials.show(id);
    }

    if s.output_path == "-" {
        s.silent = true;
    }

    Ok(Command::Run(Box::new(s)))
}

pub fn help() -> String {
    let mut out = String::new();
    out.push_str("Usage: carta [options]\n");
    out.push_str("Options:\n");
    for line in [
        "  -w, --world <world>       - world directory to render",
        "  -o, --output <output>     - output PNG file; `-' writes to stdout",
        "",
        "  -s, --silent              - print nothing except errors",
        "  -h, --help                - this text",
        "  -v, --version             - version information",
        "  -D, --debug               - verbose diagnostics while executing",
        "  -l, --list-colors         - list all block types and their colors",
        "",
        "  -t, --top <int>           - splice from the top, must be less than 128",
        "  -b, --bottom <int>       - splice from the bottom, must be non-negative",
        "  -L, --limits <N,S,E,W>    - limit render to a chunk-coordinate area;",
        "                              south and west are the positive directions",
        "",
        "Filtering options:",
        "  -e, --exclude <blockid>   - exclude block-id from render (repeatable)",
        "  -i, --include <blockid>   - include only this block-id (repeatable)",
        "  -a, --hide-all            - show no blocks except those given with `-i'",
        "  -c, --cave-mode           - top down until solid, then render downward",
        "  -n, --night               - night-time rendering mode",
        "  -H, --heightmap           - heightmap rendering mode",
        "  --striped-terrain         - darken every other vertical layer",
        "",
        "  -N, --no-check            - ignore missing <world>/level.dat",
        "",
        "Rendering options:",
        "  -q, --oblique             - oblique rendering",
        "  -y, --oblique-angle       - oblique angle rendering",
        "  -z, --isometric           - isometric rendering",
        "  -r <degrees>              - rotate the rendering 90, 180 or 270 degrees CW",
        "",
        "  -m, --threads <int>       - worker threads; defaults to the core count",
        "  -B <blockid>=<color>      - set the base color of a block;",
        "                              color is <r>,<g>,<b>[,<a>]",
        "  -S <blockid>=<color>      - set the side color of a block",
        "  -p, --split <chunks>      - split the render into tiles of this many",
        "                              chunks; <output> needs two `%d' specifiers",
        "  --pixelsplit <px>         - split the final image into tiles of this",
        "                              many pixels; <output> needs two `%d'",
        "",
        "Other options:",
        "  -x, --binary              - binary progress frames for tool integration",
        "  --require-all             - fail on any bad chunk instead of skipping",
        "  --pedantic-broad-phase    - fully parse every chunk while scanning",
        "  --show-players[=LIST]     - mark player positions from <world>/players",
        "  --show-signs[=PREFIX]     - mark signs, optionally filtered by prefix",
        "  --show-warps <file>       - mark warps from the given file",
        "  --show-coordinates        - mark every 10th chunk with its coordinates",
        "  --write-markers <file>    - write markers as JSON instead of drawing",
        "  -M, --memory-limit <MB>   - cache pixels to file above this footprint",
        "  -C, --cache-file <file>   - pixel cache file, rewritten per run",
        "  -P <file>                 - read a color palette file",
        "  -W <file>                 - write the current palette to a file",
        "  --no-alpha                - force all block colors opaque",
        "",
        "Font options:",
        "  --ttf-path <font>         - TTF file for marker text (default font.ttf)",
        "  --ttf-size <size>         - font size in pixels (default 12)",
        "  --ttf-color <color>       - marker text color (default 0,0,0,255)",
        "  --sign-color <color>      - color for sign markers",
        "  --player-color <color>    - color for player markers",
        "  --coordinate-color <color> - color for coordinate markers",
        "  --warp-color <color>      - color for warp markers",
        "",
        "Typical usage:",
        "    carta -w /path/to/world -o /path/to/map.png",
    ] {
        out.push_str(line);
        out.push('\n');
    }
    out
}

pub fn version() -> String {
    format!(
        "carta - a cartography tool for voxel worlds\nversion {}\n",
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Result<Command, Error> {
        parse(args.iter().map(|s| s.to_string()).collect())
    }

    fn settings(args: &[&str]) -> Settings {
        match run(args).unwrap() {
            Command::Run(s) => *s,
            _ => panic!("expected a run command"),
        }
    }

    #[test]
    fn defaults_and_basic_flags() {
        let s = settings(&["-w", "w", "-o", "map.png", "-z", "-n"]);
        assert_eq!(s.world_path.as_deref(), Some(std::path::Path::new("w")));
        assert_eq!(s.output_path, "map.png");
        assert_eq!(s.mode, Mode::Isometric);
        assert!(s.night);
        assert_eq!(s.top, 127);
    }

    #[test]
    fn binary_implies_silent() {
        let s = settings(&["-x"]);
        assert!(s.silent && s.binary);
    }

    #[test]
    fn splice_validation() {
        assert!(run(&["-t", "128"]).is_err());
        assert!(run(&["-b", "300"]).is_err());
        let s = settings(&["-t", "90", "-b", "10"]);
        assert_eq!((s.top, s.bottom), (90, 10));
    }

    #[test]
    fn split_and_pixelsplit_conflict() {
        assert!(run(&["-p", "10", "--pixelsplit", "256"]).is_err());
        assert!(run(&["--pixelsplit", "0"]).is_err());
    }

    #[test]
    fn color_overrides_and_exclusions() {
        let s = settings(&["-B", "Grass=0,255,0,120", "-a", "-i", "Grass", "-e", "1"]);
        assert_eq!(s.materials.get(2).base, Color::new(0, 255, 0, 120));
        let ex = s.materials.excludes();
        assert!(!ex[2]);
        assert!(ex[1]);
        assert!(ex[3]);
    }

    #[test]
    fn optional_arguments_use_the_equals_form() {
        let s = settings(&["--show-players=alice,bob", "--show-signs=[home]"]);
        assert!(s.show_players);
        assert!(s.show_players_set.contains("alice"));
        assert_eq!(s.show_signs_filter.as_deref(), Some("[home]"));
        let s = settings(&["--show-players", "--show-signs"]);
        assert!(s.show_players_set.is_empty());
        assert!(s.show_signs_filter.is_none());
    }

    #[test]
    fn rotation_validation() {
        assert!(run(&["-r", "45"]).is_err());
        let s = settings(&["-r", "-90"]);
        assert_eq!(s.rotation, Rotation::R270);
    }

    #[test]
    fn limits() {
        let s = settings(&["-L", "0,100,-10,20"]);
        assert_eq!((s.min_x, s.max_x, s.min_z, s.max_z), (0, 100, -10, 20));
    }

    #[test]
    fn unknown_flags_are_config_errors() {
        assert!(matches!(run(&["--frobnicate"]), Err(Error::Config(_))));
    }
}
