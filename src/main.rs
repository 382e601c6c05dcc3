use std::{env, error::Error, fs};

use football_possession::{AnalyzerConfig, BBox, FrameTracks, MatchAnalyzer, color_to_rgb};
use image::{Rgb, RgbImage};

const GRASS: Rgb<u8> = Rgb([40, 140, 50]);

fn paint(frame: &mut RgbImage, bbox: &BBox, shirt: Rgb<u8>) {
    for y in bbox.y_1 as u32..bbox.y_2 as u32 {
        for x in bbox.x_1 as u32..bbox.x_2 as u32 {
            frame.put_pixel(x, y, shirt);
        }
    }
}

/// Two players per side standing still while the ball rolls from a red player to a white one.
fn synthetic_clip(frame_count: usize) -> (Vec<RgbImage>, Vec<FrameTracks>) {
    let roster = [
        (1, BBox::new(100.0, 200.0, 130.0, 290.0), Rgb([200, 30, 30])),
        (2, BBox::new(300.0, 180.0, 330.0, 270.0), Rgb([200, 30, 30])),
        (3, BBox::new(500.0, 220.0, 530.0, 310.0), Rgb([240, 240, 240])),
        (4, BBox::new(700.0, 190.0, 730.0, 280.0), Rgb([240, 240, 240])),
    ];
    let mut image = RgbImage::from_pixel(800, 400, GRASS);
    for (_, bbox, shirt) in &roster {
        paint(&mut image, bbox, *shirt);
    }

    let tracks = (0..frame_count)
        .map(|frame| {
            let t = frame as f64 / frame_count as f64;
            let x = 125.0 + t * 380.0;
            let y = 285.0 + t * 20.0;
            FrameTracks {
                players: roster.iter().map(|(id, bbox, _)| (*id, *bbox)).collect(),
                referees: Default::default(),
                // the detector loses the ball for a few frames mid-pass
                ball: (!(40..46).contains(&frame)).then(|| BBox::new(x, y, x + 10.0, y + 10.0)),
            }
        })
        .collect();

    (vec![image; frame_count], tracks)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match env::args().nth(1) {
        Some(path) => AnalyzerConfig::from_json_str(&fs::read_to_string(path)?)?,
        None => AnalyzerConfig::default(),
    };
    let analyzer = MatchAnalyzer::new(config)?;

    let (frames, tracks) = synthetic_clip(90);
    let analysis = analyzer.analyze(&frames, &tracks)?;

    if let (Some(home), Some(away)) = (analysis.home_color, analysis.away_color) {
        println!(
            "team colours: home {:?}, away {:?}",
            color_to_rgb(&home),
            color_to_rgb(&away)
        );
    }
    for frame in (0..frames.len()).step_by(15) {
        let stats = analysis.stats_at(frame);
        println!(
            "frame {:>3}: possession {:?}, home {:.2}s ({}%), away {:.2}s ({}%)",
            frame,
            analysis.possession[frame],
            stats.home_seconds,
            stats.home_percentage,
            stats.away_seconds,
            stats.away_percentage
        );
    }

    Ok(())
}
