//! A thin multiplexed front-end over the `pdfkit` library: `pdfinfo`,
//! `pdftotext`, and `pdfimages`-style subcommands (`spec.md` §6 "CLI
//! surface" — explicitly external to the core, so this stays argument
//! parsing only, no algorithmic content of its own).

use std::process::ExitCode;

use pdfkit::{layout::LayoutMode, ExtractOptions, ImageExtractor, OpenOptions, TextExtractor};

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("pdfinfo") => run_pdfinfo(&args[2..]),
        Some("pdftotext") => run_pdftotext(&args[2..]),
        Some("pdfimages") => run_pdfimages(&args[2..]),
        Some("-h") | Some("-help") | Some("--help") | None => {
            print_usage();
            ExitCode::from(1)
        }
        Some("-v") => {
            println!("pdfkit-cli {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Some(other) => {
            eprintln!("unknown subcommand: {other}");
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    eprintln!("usage: pdfkit-cli <pdfinfo|pdftotext|pdfimages> [-f first] [-l last] [-opw pw] [-upw pw] <file.pdf>");
}

struct CommonArgs {
    first_page: usize,
    last_page: Option<usize>,
    user_password: Vec<u8>,
    owner_password: Vec<u8>,
    path: Option<String>,
}

fn parse_common(args: &[String]) -> CommonArgs {
    let mut out = CommonArgs { first_page: 1, last_page: None, user_password: Vec::new(), owner_password: Vec::new(), path: None };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-f" => {
                i += 1;
                out.first_page = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(1);
            }
            "-l" => {
                i += 1;
                out.last_page = args.get(i).and_then(|s| s.parse().ok());
            }
            "-upw" => {
                i += 1;
                out.user_password = args.get(i).cloned().unwrap_or_default().into_bytes();
            }
            "-opw" => {
                i += 1;
                out.owner_password = args.get(i).cloned().unwrap_or_default().into_bytes();
            }
            other => out.path = Some(other.to_string()),
        }
        i += 1;
    }
    out
}

fn open_from_args(common: &CommonArgs) -> Result<pdfkit::Document, ExitCode> {
    let Some(path) = &common.path else {
        eprintln!("missing input file");
        return Err(ExitCode::from(1));
    };
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("failed to read {path}: {e}");
            return Err(ExitCode::from(1));
        }
    };
    let options = OpenOptions { user_password: common.user_password.clone(), owner_password: common.owner_password.clone() };
    pdfkit::open(bytes, options).map_err(|e| {
        eprintln!("failed to open {path}: {e}");
        ExitCode::from(1)
    })
}

fn run_pdfinfo(args: &[String]) -> ExitCode {
    let common = parse_common(args);
    let doc = match open_from_args(&common) {
        Ok(d) => d,
        Err(code) => return code,
    };
    match doc.num_pages() {
        Ok(n) => {
            println!("Pages:          {n}");
            let meta = doc.metadata();
            if let Some(title) = meta.title() {
                println!("Title:          {title}");
            }
            println!("PDF version:    {}", doc.version());
            println!("Optimized:      {}", doc.is_optimized());
            println!("Encrypted:      {}", meta.encrypted());
            println!("Repaired:       {}", doc.used_repair);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("processing failure: {e}");
            ExitCode::from(2)
        }
    }
}

fn run_pdftotext(args: &[String]) -> ExitCode {
    let common = parse_common(args);
    let doc = match open_from_args(&common) {
        Ok(d) => d,
        Err(code) => return code,
    };
    let options = ExtractOptions {
        first_page: common.first_page,
        last_page: common.last_page,
        layout: layout_mode_from_args(args),
        no_diagonal: args.iter().any(|a| a == "-nodiag"),
        page_break: !args.iter().any(|a| a == "-nopgbrk"),
    };
    match TextExtractor::new(&doc, options).extract_all() {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("processing failure: {e}");
            ExitCode::from(2)
        }
    }
}

fn layout_mode_from_args(args: &[String]) -> LayoutMode {
    if args.iter().any(|a| a == "-layout") {
        LayoutMode::Layout
    } else if args.iter().any(|a| a == "-raw") {
        LayoutMode::Raw
    } else {
        LayoutMode::Physical
    }
}

fn run_pdfimages(args: &[String]) -> ExitCode {
    let common = parse_common(args);
    let doc = match open_from_args(&common) {
        Ok(d) => d,
        Err(code) => return code,
    };
    let last = common.last_page.unwrap_or(usize::MAX);
    match ImageExtractor::new(&doc).images(common.first_page, last) {
        Ok(images) => {
            for img in images {
                println!("page {:>4}  {}", img.page_index, img.xobject_name);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("processing failure: {e}");
            ExitCode::from(2)
        }
    }
}
