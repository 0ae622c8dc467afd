//! End-to-end tests for `#[courier::messenger]` proxies.
//!
//! Every call here is marshalled into a bundle, encoded by the wire codec,
//! pushed through a link and decoded again before it reaches the receiver.

use std::sync::Arc;
use std::sync::Mutex;

use rand::Rng;

use courier::Bundle;
use courier::CharSeq;
use courier::Discard;
use courier::Envelope;
use courier::Handle;
use courier::Outcome;
use courier::Payload;
use courier::ReceiverHandle;
use courier::Record;
use courier::RemoteHandle;
use courier::Size;
use courier::SizeF;
use courier::SparseMap;
use courier::bundle;
use courier::mailbox;
use courier::transport;
use courier::transport::Source;
use courier::wire;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Fixtures
// ============================================================================

#[courier::messenger]
pub trait Greeter {
    fn noop(&self);
    fn send(&self, words: String);
}

#[derive(Default)]
struct Greetings {
    calls: Mutex<Vec<String>>,
}

impl Greetings {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Greeter for Greetings {
    fn noop(&self) {
        self.calls.lock().unwrap().push("noop".into());
    }

    fn send(&self, words: String) {
        self.calls.lock().unwrap().push(format!("send {}", words));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Record for Point {
    const TYPE_NAME: &'static str = "demo.Point";

    fn write_fields(&self, fields: &mut Bundle) {
        fields.put_int("x", self.x);
        fields.put_int("y", self.y);
    }

    fn read_fields(fields: &Bundle) -> bundle::Result<Self> {
        Ok(Self {
            x: fields.get_int("x")?,
            y: fields.get_int("y")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Style {
    pub color: String,
    pub width: u8,
}

#[courier::messenger(records(Point), serial(Style))]
pub trait Canvas {
    fn resize(&self, size: Size, density: SizeF);
    fn stroke(&self, path: Vec<Point>, style: Style);
    fn fill(&self, origin: Point, bytes: Box<[i8]>, ratio: f64, visible: bool, mark: char);
    fn label(&self, text: CharSeq, lines: Vec<String>, ids: Vec<i32>, names: Box<[String]>);
    fn layers(&self, layers: SparseMap<Point>, corners: Box<[Point]>, surface: Handle);
    fn order(&self, zeta: i16, alpha: i64, mid: f32);
}

#[derive(Debug, Clone, PartialEq)]
enum Drawn {
    Resize(Size, SizeF),
    Stroke(Vec<Point>, Style),
    Fill(Point, Vec<i8>, f64, bool, char),
    Label(CharSeq, Vec<String>, Vec<i32>, Vec<String>),
    Layers(SparseMap<Point>, Vec<Point>, Handle),
    Order(i16, i64, f32),
}

#[derive(Default)]
struct Board {
    drawn: Mutex<Vec<Drawn>>,
}

impl Board {
    fn push(&self, drawn: Drawn) {
        self.drawn.lock().unwrap().push(drawn);
    }
}

impl Canvas for Board {
    fn resize(&self, size: Size, density: SizeF) {
        self.push(Drawn::Resize(size, density));
    }

    fn stroke(&self, path: Vec<Point>, style: Style) {
        self.push(Drawn::Stroke(path, style));
    }

    fn fill(&self, origin: Point, bytes: Box<[i8]>, ratio: f64, visible: bool, mark: char) {
        self.push(Drawn::Fill(origin, bytes.into_vec(), ratio, visible, mark));
    }

    fn label(&self, text: CharSeq, lines: Vec<String>, ids: Vec<i32>, names: Box<[String]>) {
        self.push(Drawn::Label(text, lines, ids, names.into_vec()));
    }

    fn layers(&self, layers: SparseMap<Point>, corners: Box<[Point]>, surface: Handle) {
        self.push(Drawn::Layers(layers, corners.into_vec(), surface));
    }

    fn order(&self, zeta: i16, alpha: i64, mid: f32) {
        self.push(Drawn::Order(zeta, alpha, mid));
    }
}

// ============================================================================
// Identities
// ============================================================================

#[test]
fn test_method_ids_follow_declaration_order() {
    assert_eq!(GreeterMessenger::INTERFACE, "Greeter");
    assert_eq!(GreeterMessenger::METHOD_1, 1);
    assert_eq!(GreeterMessenger::METHOD_2, 2);
    assert_eq!(GreeterMessenger::LAST_METHOD_ID, 2);
    assert_eq!(CanvasMessenger::LAST_METHOD_ID, 6);
}

// ============================================================================
// Envelopes
// ============================================================================

#[tokio::test]
async fn test_send_builds_text_envelope() -> anyhow::Result<()> {
    init_tracing();
    let (link, source) = transport::channel();
    let messenger = GreeterMessenger::connect(RemoteHandle::new(link));

    messenger.send("hi".to_owned());
    messenger.noop();

    let frame = source.recv().await?.expect("first frame");
    let envelope = wire::decode_envelope(&frame)?;
    assert_eq!(envelope.what(), 2);
    let data = envelope.data().expect("bundle");
    assert_eq!(data.len(), 1);
    assert_eq!(data.get("words"), Some(&Payload::Text("hi".into())));

    let frame = source.recv().await?.expect("second frame");
    let envelope = wire::decode_envelope(&frame)?;
    assert_eq!(envelope.what(), 1);
    assert!(envelope.data().is_none());

    let receiver = Arc::new(Greetings::default());
    let dispatcher = GreeterMessengerDispatcher::new(ReceiverHandle::owned(Arc::clone(&receiver)));
    let outcome = mailbox::deliver_frame(&dispatcher, &wire::encode_envelope(&envelope)?);
    assert!(outcome.is_delivered());
    assert_eq!(receiver.calls(), vec!["noop".to_owned()]);
    Ok(())
}

#[test]
fn test_hosted_round_trip() {
    init_tracing();
    let receiver = Arc::new(Greetings::default());
    let (messenger, mut mailbox) = GreeterMessenger::host(Arc::clone(&receiver));

    messenger.noop();
    messenger.send("hi".to_owned());

    let outcomes = mailbox.pump();
    assert_eq!(outcomes, vec![Outcome::Delivered, Outcome::Delivered]);
    assert_eq!(receiver.calls(), vec!["noop".to_owned(), "send hi".to_owned()]);
    assert_eq!(messenger.failed_sends(), 0);
}

#[test]
fn test_every_category_survives_the_wire() {
    init_tracing();
    let board = Arc::new(Board::default());
    let (canvas, mut mailbox) = CanvasMessenger::host(Arc::clone(&board));

    let style = Style { color: "teal".into(), width: 3 };
    let path = vec![Point { x: 0, y: 0 }, Point { x: 4, y: -2 }];
    let layers: SparseMap<Point> = [(7, Point { x: 1, y: 1 }), (-3, Point { x: 2, y: 2 })]
        .into_iter()
        .collect();

    canvas.resize(Size::new(800, 600), SizeF::new(2.0, 1.5));
    canvas.stroke(path.clone(), style.clone());
    canvas.fill(Point { x: 9, y: 9 }, vec![-1, 0, 1].into_boxed_slice(), 0.125, false, 'ß');
    canvas.label(
        CharSeq::new("title"),
        vec!["first".into(), "second".into()],
        vec![3, 1, 2],
        vec!["n".to_owned()].into_boxed_slice(),
    );
    canvas.layers(layers.clone(), vec![Point { x: 5, y: 6 }].into_boxed_slice(), Handle(77));

    let outcomes = mailbox.pump();
    assert_eq!(outcomes.len(), 5);
    assert!(outcomes.iter().all(Outcome::is_delivered), "{:?}", outcomes);

    let drawn = board.drawn.lock().unwrap().clone();
    assert_eq!(
        drawn,
        vec![
            Drawn::Resize(Size::new(800, 600), SizeF::new(2.0, 1.5)),
            Drawn::Stroke(path, style),
            Drawn::Fill(Point { x: 9, y: 9 }, vec![-1, 0, 1], 0.125, false, 'ß'),
            Drawn::Label(
                CharSeq::new("title"),
                vec!["first".into(), "second".into()],
                vec![3, 1, 2],
                vec!["n".into()],
            ),
            Drawn::Layers(layers, vec![Point { x: 5, y: 6 }], Handle(77)),
        ]
    );
}

#[test]
fn test_arguments_keep_declaration_order() {
    let board = Arc::new(Board::default());
    let (canvas, mut mailbox) = CanvasMessenger::host(Arc::clone(&board));

    canvas.order(-4, 1 << 40, 0.5);
    mailbox.pump();

    assert_eq!(*board.drawn.lock().unwrap(), vec![Drawn::Order(-4, 1 << 40, 0.5)]);
}

// ============================================================================
// Discards
// ============================================================================

#[test]
fn test_unknown_id_is_skipped() -> anyhow::Result<()> {
    init_tracing();
    let receiver = Arc::new(Greetings::default());
    let (messenger, mut mailbox) = GreeterMessenger::host(Arc::clone(&receiver));

    messenger.handle().send(wire::encode_envelope(&Envelope::new(99))?)?;
    messenger.send("after".to_owned());

    let outcomes = mailbox.pump();
    assert_eq!(
        outcomes,
        vec![Outcome::Discarded(Discard::UnknownMethod(99)), Outcome::Delivered]
    );
    assert_eq!(receiver.calls(), vec!["send after".to_owned()]);
    Ok(())
}

#[test]
fn test_malformed_bundle_is_skipped() -> anyhow::Result<()> {
    let receiver = Arc::new(Greetings::default());
    let (messenger, mut mailbox) = GreeterMessenger::host(Arc::clone(&receiver));

    let mut wrong = Bundle::new();
    wrong.put_int("words", 5);
    let handle = messenger.handle();
    handle.send(wire::encode_envelope(&Envelope::with_data(2, wrong))?)?;
    handle.send(wire::encode_envelope(&Envelope::new(2))?)?;
    handle.send(vec![0x52, 0x02])?;
    messenger.noop();

    let outcomes = mailbox.pump();
    assert_eq!(outcomes.len(), 4);
    assert!(matches!(
        &outcomes[0],
        Outcome::Discarded(Discard::Malformed { what: 2, error: bundle::Error::TypeMismatch { .. } })
    ));
    assert_eq!(
        outcomes[1],
        Outcome::Discarded(Discard::Malformed {
            what: 2,
            error: bundle::Error::Missing("words".into()),
        })
    );
    assert_eq!(outcomes[2], Outcome::Discarded(Discard::Undecodable(wire::Error::UnexpectedEnd)));
    assert_eq!(outcomes[3], Outcome::Delivered);
    assert_eq!(receiver.calls(), vec!["noop".to_owned()]);
    Ok(())
}

#[test]
fn test_disposed_receiver_consumes_envelope() -> anyhow::Result<()> {
    let receiver = Arc::new(Greetings::default());
    let dispatcher = GreeterMessengerDispatcher::new(ReceiverHandle::weak(&receiver));
    assert!(dispatcher.is_live());
    drop(receiver);
    assert!(!dispatcher.is_live());

    let frame = wire::encode_envelope(&Envelope::new(1))?;
    assert_eq!(
        mailbox::deliver_frame(&dispatcher, &frame),
        Outcome::Discarded(Discard::ReceiverDisposed)
    );
    Ok(())
}

// ============================================================================
// Delivery
// ============================================================================

#[test]
fn test_failed_sends_are_counted() {
    init_tracing();
    let receiver = Arc::new(Greetings::default());
    let (messenger, mailbox) = GreeterMessenger::host(Arc::clone(&receiver));
    drop(mailbox);

    messenger.noop();
    messenger.send("lost".to_owned());

    assert_eq!(messenger.failed_sends(), 2);
    assert!(receiver.calls().is_empty());
}

#[test]
fn test_random_sequence_keeps_order() {
    let mut rng = rand::thread_rng();
    let receiver = Arc::new(Greetings::default());
    let (messenger, mut mailbox) = GreeterMessenger::host(Arc::clone(&receiver));

    let mut expected = Vec::new();
    for _ in 0..200 {
        if rng.gen_bool(0.3) {
            messenger.noop();
            expected.push("noop".to_owned());
        } else {
            let n: u32 = rng.gen_range(0..10_000);
            messenger.send(n.to_string());
            expected.push(format!("send {}", n));
        }
    }

    let outcomes = mailbox.pump();
    assert_eq!(outcomes.len(), 200);
    assert_eq!(receiver.calls(), expected);
}

#[tokio::test]
async fn test_spawned_mailbox_drains_after_proxies_drop() {
    let receiver = Arc::new(Greetings::default());
    let (messenger, mailbox) = GreeterMessenger::host(Arc::clone(&receiver));
    let task = mailbox.spawn();

    let second = GreeterMessenger::connect(messenger.handle());
    for n in 0..20 {
        messenger.send(n.to_string());
    }
    second.noop();
    drop(messenger);
    drop(second);
    task.await.unwrap();

    let calls = receiver.calls();
    assert_eq!(calls.len(), 21);
    assert_eq!(calls[0], "send 0");
    assert_eq!(calls[19], "send 19");
    assert_eq!(calls[20], "noop");
}

#[tokio::test]
async fn test_serve_over_channel() -> anyhow::Result<()> {
    let receiver = Arc::new(Greetings::default());
    let (link, source) = transport::channel();
    let messenger = GreeterMessenger::connect(RemoteHandle::new(link));

    messenger.send("one".to_owned());
    messenger.send("two".to_owned());
    drop(messenger);

    let dispatcher = GreeterMessengerDispatcher::new(ReceiverHandle::owned(Arc::clone(&receiver)));
    mailbox::serve(&source, &dispatcher).await?;

    assert_eq!(receiver.calls(), vec!["send one".to_owned(), "send two".to_owned()]);
    Ok(())
}
