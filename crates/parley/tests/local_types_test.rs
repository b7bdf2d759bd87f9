use std::time::Duration;

use parley::{create_dedicated_worker, Endpoint, EndpointConfig, RemoteAware, WireFormat};
use tokio::sync::mpsc;
use tokio::time::timeout;

#[parley::remote_pair(Archive, Ledger)]
mod archive_rpc {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct User {
        pub name: String,
        pub age: u8,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Page<T> {
        pub items: Vec<T>,
        pub next: Option<u32>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Event {
        Joined(User),
        Renamed { from: String, to: String },
        Left,
    }

    pub type Roster = Vec<User>;

    /// Has no serde impls; only reaches the wire through `millis`.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Millis(pub u64);

    mod millis {
        use serde::{Deserialize, Deserializer, Serializer};

        use super::Millis;

        pub fn serialize<S: Serializer>(value: &Millis, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_u64(value.0)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Millis, D::Error> {
            u64::deserialize(deserializer).map(Millis)
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Job {
        pub name: String,
        #[serde(with = "millis")]
        pub timeout: Millis,
        #[serde(skip)]
        pub local_only: Option<std::sync::mpsc::Sender<u8>>,
    }

    #[route("archive")]
    pub trait Archive {
        fn store_user(&self, user: self::User);
        fn store_page(&self, page: Page<User>);
        fn record(&self, event: Event);
        fn replace(&self, roster: Roster, extra: Vec<User>);
        fn submit(&self, job: Job);
    }

    #[route("ledger")]
    pub trait Ledger {
        fn stored(&self, count: u32);
    }
}

use archive_rpc::{
    Archive, ArchiveProxyImpl, Event, Job, Ledger, LedgerProxyImpl, Millis, Page, User,
};

#[derive(Debug)]
enum Received {
    User(User),
    Page(Page<User>),
    Event(Event),
    Roster(Vec<User>, Vec<User>),
    Job(Job),
}

struct ArchiveSide {
    received: mpsc::UnboundedSender<Received>,
    ledger: Option<LedgerProxyImpl>,
}

impl ArchiveSide {
    fn keep(&self, item: Received) {
        let _ = self.received.send(item);
        if let Some(ledger) = self.get_remote() {
            ledger.stored(1);
        }
    }
}

impl RemoteAware<LedgerProxyImpl> for ArchiveSide {
    fn set_remote(&mut self, remote: LedgerProxyImpl) {
        self.ledger = Some(remote);
    }

    fn get_remote(&self) -> Option<&LedgerProxyImpl> {
        self.ledger.as_ref()
    }
}

impl Archive for ArchiveSide {
    fn store_user(&self, user: User) {
        self.keep(Received::User(user));
    }

    fn store_page(&self, page: Page<User>) {
        self.keep(Received::Page(page));
    }

    fn record(&self, event: Event) {
        self.keep(Received::Event(event));
    }

    fn replace(&self, roster: Vec<User>, extra: Vec<User>) {
        self.keep(Received::Roster(roster, extra));
    }

    fn submit(&self, job: Job) {
        self.keep(Received::Job(job));
    }
}

struct LedgerSide {
    acks: mpsc::UnboundedSender<u32>,
    archive: Option<ArchiveProxyImpl>,
}

impl RemoteAware<ArchiveProxyImpl> for LedgerSide {
    fn set_remote(&mut self, remote: ArchiveProxyImpl) {
        self.archive = Some(remote);
    }

    fn get_remote(&self) -> Option<&ArchiveProxyImpl> {
        self.archive.as_ref()
    }
}

impl Ledger for LedgerSide {
    fn stored(&self, count: u32) {
        let _ = self.acks.send(count);
    }
}

fn user(name: &str, age: u8) -> User {
    User {
        name: name.to_string(),
        age,
    }
}

async fn next(received: &mut mpsc::UnboundedReceiver<Received>) -> Received {
    timeout(Duration::from_secs(5), received.recv())
        .await
        .expect("archive received nothing")
        .expect("archive endpoint stopped")
}

async fn local_types_round_trip(format: WireFormat) {
    let config = EndpointConfig::builder().wire_format(format).build();
    let (received_tx, mut received) = mpsc::unbounded_channel();
    let (acks_tx, mut acks) = mpsc::unbounded_channel();
    let errors = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen = std::sync::Arc::clone(&errors);

    let pair = create_dedicated_worker(
        Endpoint::<ArchiveProxyImpl, _>::new(LedgerSide {
            acks: acks_tx,
            archive: None,
        })
        .with_config(config.clone()),
        Endpoint::<LedgerProxyImpl, _>::new(ArchiveSide {
            received: received_tx,
            ledger: None,
        })
        .with_config(config)
        .on_error(move |err: &parley::ParleyError| seen.lock().unwrap().push(err.to_string())),
    );
    pair.host.connected().await.unwrap();

    let archive = pair.host.remote();
    let ada = user("ada", 36);
    let page = Page {
        items: vec![user("grace", 45), user("alan", 41)],
        next: Some(2),
    };
    let events = [
        Event::Joined(ada.clone()),
        Event::Renamed {
            from: "ada".to_string(),
            to: "countess".to_string(),
        },
        Event::Left,
    ];

    archive.store_user(ada.clone());
    archive.store_page(page.clone());
    for event in &events {
        archive.record(event.clone());
    }
    archive.replace(vec![ada.clone()], Vec::new());
    let (local_tx, _local_rx) = std::sync::mpsc::channel();
    archive.submit(Job {
        name: "reindex".to_string(),
        timeout: Millis(1500),
        local_only: Some(local_tx),
    });

    assert!(matches!(next(&mut received).await, Received::User(got) if got == ada));
    assert!(matches!(next(&mut received).await, Received::Page(got) if got == page));
    for event in &events {
        assert!(matches!(next(&mut received).await, Received::Event(got) if got == *event));
    }
    match next(&mut received).await {
        Received::Roster(roster, extra) => {
            assert_eq!(roster, vec![ada.clone()]);
            assert!(extra.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
    match next(&mut received).await {
        Received::Job(job) => {
            assert_eq!(job.name, "reindex");
            assert_eq!(job.timeout, Millis(1500));
            assert!(job.local_only.is_none());
        }
        other => panic!("unexpected {other:?}"),
    }

    for _ in 0..7 {
        assert_eq!(acks.recv().await, Some(1));
    }
    assert!(errors.lock().unwrap().is_empty(), "{:?}", errors.lock().unwrap());
    pair.host.close();
}

#[tokio::test]
async fn test_local_types_round_trip_bincode() {
    local_types_round_trip(WireFormat::Bincode).await;
}

#[tokio::test]
async fn test_local_types_round_trip_json() {
    local_types_round_trip(WireFormat::Json).await;
}

#[test]
fn test_skipped_and_custom_fields_stay_out_of_serializers() {
    use parley::{GeneratedUnit, WireSerializer};

    type Outbound = <ArchiveProxyImpl as GeneratedUnit>::OutboundSerializer;
    assert!(Outbound::supports("Job"));
    assert!(Outbound::supports("Vec < User >"));
    assert!(Outbound::supports("Page < User >"));
    assert!(!Outbound::supports("Roster"));
    assert!(!Outbound::supports("Millis"));
    assert!(!Outbound::supports("Option < std :: sync :: mpsc :: Sender < u8 > >"));
}
