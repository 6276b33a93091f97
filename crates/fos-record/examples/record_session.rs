//! Example: record a short scripted session and slice it

use std::rc::Rc;

use fos_dom::Document;
use fos_record::{ManualClock, RecordingOptions, RecordingStream, SourceEventType};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let mut doc = Document::new("https://example.com/signup");
    let form = doc.create_element("form");
    let email = doc.create_element_with("input", &[("type", "email"), ("name", "email")]);
    let news = doc.create_element_with("input", &[("type", "checkbox"), ("name", "news")]);
    let style = doc.create_element("style");
    doc.append_child(doc.head(), style)?;
    doc.append_child(doc.body(), form)?;
    doc.append_child(form, email)?;
    doc.append_child(form, news)?;

    let options = RecordingOptions::from_json(r#"{ "snapshotInterval": 1000, "maxBufferSize": 4096 }"#)?;
    let clock = ManualClock::new(0.0);
    let mut stream = RecordingStream::with_clock(options, Rc::new(clock.clone()));
    stream.start(&mut doc)?;

    let _tail = stream.tail(|event| println!("  tail: {:?} at {:.0}ms", event.event_type(), event.time));

    for (i, ch) in "me@example.com".chars().enumerate() {
        clock.advance(120.0);
        let typed: String = "me@example.com".chars().take(i + 1).collect();
        doc.pointer_move(40.0 + i as f64, 80.0);
        doc.key_down(&ch.to_string());
        doc.user_input(email, &typed)?;
        doc.key_up(&ch.to_string());
        stream.poll(&mut doc)?;
    }

    clock.advance(300.0);
    doc.pointer_down(news, 12.0, 140.0);
    doc.user_check(news, true)?;
    doc.pointer_up(news, 12.0, 140.0);
    doc.insert_rule(style, "form { outline: 1px solid green }", 0)?;
    clock.advance(200.0);
    stream.poll(&mut doc)?;

    let recording = stream.slice()?;
    println!("{}", recording);
    println!(
        "buffered {} events / {} bytes, snapshots at {:?}",
        stream.buffered_events(),
        stream.buffered_bytes(),
        recording.snapshot_index
    );
    let patches = (0..recording.len())
        .filter(|&i| matches!(recording.event_type(i), Some(Ok(SourceEventType::DomPatch))))
        .count();
    println!("{} DOM patches", patches);

    stream.stop(&mut doc)?;
    Ok(())
}
