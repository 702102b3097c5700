//! End-to-end tests over a real loopback UDP socket.
//!
//! The server runs in the same task as the client (joined futures), with a
//! manual clock so expiry can be triggered without sleeping.
//!
//! Run with: `cargo test --test udp_end_to_end_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use boxoffice_runtime::transport::UdpTransport;
use boxoffice_testing::{ManualClock, test_clock};
use boxoffice_core::environment::Clock;
use chrono::Duration;
use std::net::SocketAddr;
use std::sync::Arc;
use ticketing::{
    BoxOfficeEnvironment, Catalog, Cookie, EventEntry, EventId, Ledger, RandomCookieGenerator,
    Request, Response, ReservationId, new_store, serve,
};
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

const REPLY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

struct Client {
    socket: UdpSocket,
    server: SocketAddr,
}

impl Client {
    async fn new(server: SocketAddr) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        Self { socket, server }
    }

    async fn send_raw(&self, payload: &[u8]) {
        self.socket.send_to(payload, self.server).await.unwrap();
    }

    async fn call(&self, request: &Request) -> Response {
        self.send_raw(&request.encode()).await;
        let mut buffer = vec![0u8; 65_536];
        let (len, from) = tokio::time::timeout(REPLY_TIMEOUT, self.socket.recv_from(&mut buffer))
            .await
            .expect("server replied in time")
            .unwrap();
        assert_eq!(from, self.server);
        Response::decode(&buffer[..len]).unwrap()
    }

    async fn events(&self) -> Vec<EventEntry> {
        match self.call(&Request::GetEvents).await {
            Response::Events(entries) => entries,
            other => panic!("expected EVENTS, got {other:?}"),
        }
    }
}

fn concert_catalog() -> Catalog {
    Catalog::from_entries([("Concert", 10)]).unwrap()
}

/// Run `client` against a live server and shut the server down afterwards
async fn with_server<F, Fut>(catalog: Catalog, clock: Arc<ManualClock>, client: F)
where
    F: FnOnce(SocketAddr, Arc<ManualClock>) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let store = new_store(
        Ledger::new(catalog, Duration::seconds(5)),
        BoxOfficeEnvironment::new(clock.clone(), Arc::new(RandomCookieGenerator::new())),
    );
    let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = transport.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = serve(&store, &transport, async {
        let _ = stop_rx.await;
    });
    let client = async {
        client(addr, clock).await;
        let _ = stop_tx.send(());
    };

    let (served, ()) = tokio::join!(server, client);
    served.expect("serve loop exits cleanly on shutdown");
}

#[tokio::test]
async fn concert_scenario() {
    let clock = Arc::new(ManualClock::starting_at(test_clock().now()));

    with_server(concert_catalog(), clock, |addr, clock| async move {
        let client = Client::new(addr).await;

        let events = client.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].description, b"Concert");
        assert_eq!(events[0].tickets_remaining, 10);

        // Reserve 3 of 10
        let Response::Reservation {
            reservation_id,
            event_id,
            ticket_count,
            cookie,
            expires_at,
        } = client
            .call(&Request::GetReservation {
                event_id: EventId::new(0),
                ticket_count: 3,
            })
            .await
        else {
            panic!("expected RESERVATION");
        };
        assert_eq!(reservation_id, ReservationId::new(1_000_000));
        assert_eq!(event_id, EventId::new(0));
        assert_eq!(ticket_count, 3);
        assert!(cookie.is_printable());
        let now = u64::try_from(clock.now().timestamp()).unwrap();
        assert_eq!(expires_at, now + 5);

        assert_eq!(client.events().await[0].tickets_remaining, 7);

        // Redeem, then redeem again
        let redeem = Request::GetTickets {
            reservation_id,
            cookie,
        };
        let first = client.call(&redeem).await;
        let Response::Tickets { tickets, .. } = &first else {
            panic!("expected TICKETS, got {first:?}");
        };
        let codes: Vec<&str> = tickets.iter().map(|t| t.as_str()).collect();
        assert_eq!(codes, vec!["0000001", "0000002", "0000003"]);
        assert_eq!(client.call(&redeem).await, first);

        // Wrong cookie
        let wrong = client
            .call(&Request::GetTickets {
                reservation_id,
                cookie: Cookie::new([b'!'; 48]),
            })
            .await;
        assert_eq!(wrong, Response::BadRequest { id: 1_000_000 });

        // A second reservation left to expire
        let Response::Reservation {
            reservation_id: late_id,
            cookie: late_cookie,
            ..
        } = client
            .call(&Request::GetReservation {
                event_id: EventId::new(0),
                ticket_count: 2,
            })
            .await
        else {
            panic!("expected RESERVATION");
        };
        assert_eq!(late_id, ReservationId::new(1_000_001));

        clock.advance(Duration::seconds(6));
        let expired = client
            .call(&Request::GetTickets {
                reservation_id: late_id,
                cookie: late_cookie,
            })
            .await;
        assert_eq!(expired, Response::BadRequest { id: 1_000_001 });

        // Expired tickets are not returned to inventory; the realized ones are still valid
        assert_eq!(client.events().await[0].tickets_remaining, 5);
        assert_eq!(client.call(&redeem).await, first);
    })
    .await;
}

#[tokio::test]
async fn unknown_event_is_refused_without_touching_inventory() {
    let clock = Arc::new(ManualClock::starting_at(test_clock().now()));

    with_server(concert_catalog(), clock, |addr, _clock| async move {
        let client = Client::new(addr).await;

        let response = client
            .call(&Request::GetReservation {
                event_id: EventId::new(42),
                ticket_count: 1,
            })
            .await;
        assert_eq!(response, Response::BadRequest { id: 42 });
        assert_eq!(client.events().await[0].tickets_remaining, 10);
    })
    .await;
}

#[tokio::test]
async fn empty_and_malformed_datagrams_get_no_reply() {
    let clock = Arc::new(ManualClock::starting_at(test_clock().now()));

    with_server(concert_catalog(), clock, |addr, _clock| async move {
        let client = Client::new(addr).await;

        client.send_raw(&[]).await;
        client.send_raw(&[1, 0]).await;
        client.send_raw(&[9]).await;

        // The first reply the client sees belongs to this request
        let events = client.events().await;
        assert_eq!(events.len(), 1);
    })
    .await;
}

#[tokio::test]
async fn replies_go_to_each_sender() {
    let clock = Arc::new(ManualClock::starting_at(test_clock().now()));
    let catalog = Catalog::from_entries([("Concert", 10), ("Opera", 4)]).unwrap();

    with_server(catalog, clock, |addr, _clock| async move {
        let alice = Client::new(addr).await;
        let bob = Client::new(addr).await;

        let a = alice
            .call(&Request::GetReservation {
                event_id: EventId::new(0),
                ticket_count: 1,
            })
            .await;
        let b = bob
            .call(&Request::GetReservation {
                event_id: EventId::new(1),
                ticket_count: 4,
            })
            .await;

        assert!(matches!(a, Response::Reservation { event_id, .. } if event_id == EventId::new(0)));
        assert!(matches!(b, Response::Reservation { event_id, .. } if event_id == EventId::new(1)));

        let remaining: Vec<u16> = alice.events().await.iter().map(|e| e.tickets_remaining).collect();
        assert_eq!(remaining, vec![9, 0]);
    })
    .await;
}
