use std::error::Error;
use std::path::Path;

use bubblegrid::{render_overlay, AnswerKeyBook, SheetProcessor, Template};

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!(
            "Usage: {} <template.json> <keys.xlsx> <sheet_image> [overlay_out.png]",
            args[0]
        );
        std::process::exit(2);
    }

    let template = Template::from_json_file(Path::new(&args[1]))?;
    let keys = AnswerKeyBook::from_xlsx_file(Path::new(&args[2]))?;
    let raw = image::open(&args[3])?.to_rgb8();

    let processor = SheetProcessor::new(template)?;
    let canonical = processor.rectify(&raw);
    let report = processor.process_canonical(&canonical, &keys, None);

    println!(
        "Version {}: {} answered, {} flagged, total {}",
        report.version,
        report.detection.n_answered(),
        report.detection.flags.len(),
        report.score.total
    );
    for (subject, score) in &report.score.per_subject {
        println!("  {}: {}", subject, score);
    }

    if let Some(out_path) = args.get(4) {
        let overlay = render_overlay(&canonical, processor.template(), &report.detection);
        overlay.save(out_path)?;
        println!("Wrote {out_path}");
    }
    Ok(())
}
