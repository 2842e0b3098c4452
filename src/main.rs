//! Replays a recorded session fixture through the state engine.
//!
//! Usage: `scenelabel-replay <fixture.json> [--config <config.json>] [--record <id>]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(e) = replay::run() {
        eprintln!("Replay error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod replay {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::error::Error;
    use std::path::PathBuf;
    use std::rc::Rc;

    use scenelabel::model::AnnotateMode;
    use scenelabel::{Editor, EditorConfig, InMemoryApi, LoadError, LoadManager};

    struct Args {
        fixture: PathBuf,
        config: Option<PathBuf>,
        record: Option<String>,
    }

    fn parse_args() -> Result<Args, String> {
        let mut fixture = None;
        let mut config = None;
        let mut record = None;
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => config = Some(PathBuf::from(args.next().ok_or("--config needs a path")?)),
                "--record" => record = Some(args.next().ok_or("--record needs an id")?),
                other if fixture.is_none() => fixture = Some(PathBuf::from(other)),
                other => return Err(format!("unexpected argument '{}'", other)),
            }
        }
        let fixture = fixture.ok_or("usage: scenelabel-replay <fixture.json> [--config <path>] [--record <id>]")?;
        Ok(Args {
            fixture,
            config,
            record,
        })
    }

    pub fn run() -> Result<(), Box<dyn Error>> {
        let args = parse_args()?;
        let config = match &args.config {
            Some(path) => EditorConfig::load_from_file(path)?,
            None => EditorConfig::default(),
        };

        env_logger::Builder::new()
            .filter_level(config.preferences.log_level.to_level_filter())
            .parse_default_env()
            .init();

        let json = std::fs::read_to_string(&args.fixture)?;
        let api = InMemoryApi::from_json(&json)?;
        let record_id = args.record.unwrap_or_else(|| api.fixture().record_id.clone());

        let editor = Editor::new(config).into_shared();
        let events: Rc<RefCell<BTreeMap<String, usize>>> = Rc::default();
        {
            let sink = Rc::clone(&events);
            editor.borrow_mut().data.events_mut().subscribe_all(move |event| {
                *sink.borrow_mut().entry(format!("{:?}", event.kind())).or_default() += 1;
            });
        }

        let loader = LoadManager::new(Rc::clone(&editor), api);
        pollster::block_on(async {
            loader.load_record(&record_id).await?;
            loader.load_classes().await?;
            loader.load_scene_data(0).await?;
            Ok::<_, LoadError>(())
        })?;

        let editor = editor.borrow();
        let state = &editor.state;
        println!(
            "Record {}: {} scenes (series: {})",
            record_id,
            state.scene_ids.len(),
            state.is_series_frame
        );
        println!(
            "Scene {}: {} frames",
            state.scene_id.as_deref().unwrap_or("-"),
            state.frames.len()
        );
        for frame_id in &state.frames {
            let count = |mode| editor.data.get_frame_objects(frame_id, mode).map_or(0, |o| o.len());
            println!(
                "  frame {}: {} instance / {} segmentation objects ({:?})",
                frame_id,
                count(AnnotateMode::Instance),
                count(AnnotateMode::Segmentation),
                editor.data.load_state(frame_id)
            );
        }
        println!("Tracks: {}", state.tracks.len());
        for (kind, count) in events.borrow().iter() {
            println!("  {} x{}", kind, count);
        }
        Ok(())
    }
}

// WASM builds use the library only
#[cfg(target_arch = "wasm32")]
fn main() {}
