use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use shpipe::{cat, cut, du, echo, for_each, grep, head, stage, to_file, wc, Error, LineSink};

#[test]
fn echo_splits_on_newline() {
    let mut out = echo("Hello\nWorld!");
    assert_eq!(out.recv().as_deref(), Some("Hello"));
    assert_eq!(out.recv().as_deref(), Some("World!"));
    assert_eq!(out.recv(), None);
    assert!(out.finish().is_ok());

    assert_eq!(echo("").read_all().unwrap(), vec![""]);
    assert_eq!(echo("a\n").read_all().unwrap(), vec!["a", ""]);
}

#[test]
fn head_limits_and_drains() {
    let mut out = head(echo("Hello\nWorld!"), 2);
    assert_eq!(out.recv().as_deref(), Some("Hello"));
    assert_eq!(out.recv().as_deref(), Some("World!"));

    assert_eq!(wc(head(echo("Hello\nWorld!"), -1)).unwrap(), 0);
    assert_eq!(wc(head(echo("Hello\nWorld!"), 0)).unwrap(), 0);
    assert_eq!(wc(head(echo("Hello\nWorld!"), 1)).unwrap(), 1);
    assert_eq!(wc(head(echo("Hello\nWorld!"), 2)).unwrap(), 2);
    assert_eq!(wc(head(echo("Hello\nWorld!"), 3)).unwrap(), 2);
}

#[test]
fn head_reads_its_input_to_the_end() {
    const N: usize = 50;
    let sent = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&sent);
    let upstream = stage("count", move |out: &LineSink| {
        for i in 0..N {
            out.send(i.to_string())?;
            counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    });

    assert_eq!(wc(head(upstream, 1)).unwrap(), 1);
    assert_eq!(sent.load(Ordering::SeqCst), N);
}

#[test]
fn echo_to_file_cat_du_grep_for() {
    let dir = tempfile::tempdir().expect("tempdir");
    let filename = dir.path().join("sh_test");
    assert_eq!(to_file(echo("Hello\nWorld!"), &filename).unwrap(), 2);

    let mut out = cat(&filename);
    assert_eq!(out.recv().as_deref(), Some("Hello"));
    assert_eq!(out.recv().as_deref(), Some("World!"));
    assert_eq!(out.recv(), None);

    let found = grep(du(dir.path()), "sh_test").read_all().unwrap();
    assert_eq!(found, vec![filename.to_string_lossy().to_string()]);

    let hello = for_each(du(dir.path()), |f: &str| grep(cat(f), "Hello")).read_all().unwrap();
    assert_eq!(hello, vec!["Hello"]);
}

#[test]
fn to_file_then_cat_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lines.txt");
    let lines = vec!["alpha", "", "  beta  ", "gamma=1"];
    assert_eq!(to_file(echo(lines.join("\n")), &path).unwrap(), 4);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "alpha\n\n  beta  \ngamma=1\n");
    assert_eq!(cat(&path).read_all().unwrap(), lines);
}

#[test]
fn cat_handles_crlf_and_missing_final_newline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("dos.txt");
    std::fs::write(&path, b"one\r\ntwo\nthree").unwrap();
    assert_eq!(cat(&path).read_all().unwrap(), vec!["one", "two", "three"]);
}

#[test]
fn du_lists_files_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    std::fs::create_dir_all(root.join("a/deep/er")).unwrap();
    std::fs::create_dir_all(root.join("b")).unwrap();
    std::fs::create_dir_all(root.join("empty")).unwrap();
    let files = ["a/x.txt", "a/deep/y.txt", "a/deep/er/z.txt", "b/w.txt", "b/v.txt"];
    for f in files {
        std::fs::write(root.join(f), b"data\n").unwrap();
    }

    let listed = du(root).read_all().unwrap();
    assert_eq!(listed.len(), files.len());
    let got: BTreeSet<String> = listed.iter().cloned().collect();
    let want: BTreeSet<String> = files.iter().map(|f| root.join(f).to_string_lossy().to_string()).collect();
    assert_eq!(got, want);

    // Name order within a directory.
    let b: Vec<&String> = listed.iter().filter(|p| p.contains("/b/")).collect();
    assert!(b[0].ends_with("v.txt") && b[1].ends_with("w.txt"));
}

#[test]
fn grep_filters_and_is_idempotent() {
    let text = "apple\nbanana\ncherry\navocado";
    let once = grep(echo(text), "^a").read_all().unwrap();
    assert_eq!(once, vec!["apple", "avocado"]);
    assert_eq!(grep(grep(echo(text), "^a"), "^a").read_all().unwrap(), once);
}

#[test]
fn cut_selects_fields() {
    let mut out = cut(echo("a=apple\nsome\nb=banana\nc"), 2, "=");
    assert_eq!(out.recv().as_deref(), Some("apple"));
    assert_eq!(out.recv().as_deref(), Some("banana"));
    assert_eq!(out.recv(), None);

    let ws = cut(echo("  1   one\n2\ttwo\nthree"), 2, "").read_all().unwrap();
    assert_eq!(ws, vec!["one", "two"]);
    assert_eq!(wc(cut(echo("a=b"), 0, "=")).unwrap(), 0);
}

#[test]
fn errors_travel_to_the_sink() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing");

    match wc(head(cat(&missing), 1)) {
        Err(Error::Open { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected open error, got {other:?}"),
    }
    assert!(matches!(wc(du(&missing)), Err(Error::ListDir { .. })));
    assert!(matches!(wc(cat(dir.path())), Err(Error::Read { .. })));
    assert!(matches!(wc(grep(echo("x"), "(")), Err(Error::Pattern { .. })));
    assert!(matches!(to_file(echo("x"), dir.path().join("no/such/dir")), Err(Error::Create { .. })));
}

#[test]
fn dropped_consumer_releases_producer() {
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let mut numbers = stage("numbers", move |out| {
        let _done = done_tx;
        for i in 0u64.. {
            out.send(i.to_string())?;
        }
        Ok(())
    });
    assert_eq!(numbers.recv().as_deref(), Some("0"));
    assert_eq!(numbers.recv().as_deref(), Some("1"));
    drop(numbers);
    assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Err(mpsc::RecvTimeoutError::Disconnected));
}

#[test]
fn panicking_stage_is_reported() {
    let s = stage("boom", |_out: &LineSink| -> shpipe::Result<()> { panic!("boom") });
    assert!(matches!(s.finish(), Err(Error::Panicked(name)) if name == "boom"));
}

#[test]
fn for_with_sink_handler() {
    let src = concat!(env!("CARGO_MANIFEST_DIR"), "/src");
    let rs = grep(du(src), r"\.rs$");
    let defining = for_each(rs, |x: &str, out: &LineSink| -> shpipe::Result<()> {
        if to_file(grep(cat(x), "pub fn for_each"), "/dev/null")? > 0 {
            out.send(x)?;
        }
        Ok(())
    });
    let found = defining.read_all().unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].ends_with("fanout.rs"));
}
