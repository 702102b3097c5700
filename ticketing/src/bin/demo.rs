//! Box office demo client
//!
//! Walks a running server through the whole ticket flow:
//! - List events
//! - Reserve tickets for the first event with inventory
//! - Redeem the reservation, then redeem it again
//! - Try a wrong cookie
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server -- --file events.txt &
//! cargo run --bin demo -- --server 127.0.0.1:2022
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use ticketing::{Cookie, Request, Response, types::COOKIE_LEN};
use tokio::net::UdpSocket;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "boxoffice-demo")]
#[command(version, about = "Exercise a running box office server")]
struct Args {
    /// Server address
    #[arg(long, default_value = "127.0.0.1:2022", env = "BOXOFFICE_SERVER")]
    server: SocketAddr,

    /// Tickets to reserve
    #[arg(long, default_value_t = 3)]
    tickets: u16,

    /// Seconds to wait for each reply
    #[arg(long, default_value_t = 2)]
    reply_timeout: u64,
}

struct Client {
    socket: UdpSocket,
    reply_timeout: Duration,
}

impl Client {
    async fn connect(server: SocketAddr, reply_timeout: Duration) -> std::io::Result<Self> {
        let bind: SocketAddr = if server.is_ipv4() {
            ([0u8; 4], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(server).await?;
        Ok(Self {
            socket,
            reply_timeout,
        })
    }

    async fn call(&self, request: &Request) -> Result<Response, Box<dyn std::error::Error>> {
        self.socket.send(&request.encode()).await?;
        let mut buffer = vec![0u8; 65_536];
        let len = tokio::time::timeout(self.reply_timeout, self.socket.recv(&mut buffer)).await??;
        Ok(Response::decode(&buffer[..len])?)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let client = Client::connect(args.server, Duration::from_secs(args.reply_timeout)).await?;

    println!("\n🎫 ============================================");
    println!("   Box Office - Live Demo ({})", args.server);
    println!("============================================\n");

    // ========== Step 1: list events ==========
    let Response::Events(events) = client.call(&Request::GetEvents).await? else {
        return Err("server did not answer GET_EVENTS with EVENTS".into());
    };
    println!("📋 {} events on sale:", events.len());
    for event in &events {
        println!(
            "   #{:<4} {:>5} left  {}",
            event.event_id,
            event.tickets_remaining,
            String::from_utf8_lossy(&event.description)
        );
    }

    let Some(event) = events
        .iter()
        .find(|event| event.tickets_remaining >= args.tickets)
    else {
        println!("\n❌ No event has {} tickets left", args.tickets);
        return Ok(());
    };

    // ========== Step 2: reserve ==========
    let response = client
        .call(&Request::GetReservation {
            event_id: event.event_id,
            ticket_count: args.tickets,
        })
        .await?;
    let Response::Reservation {
        reservation_id,
        cookie,
        expires_at,
        ..
    } = response
    else {
        println!("\n❌ Reservation refused: {response:?}");
        return Ok(());
    };
    println!(
        "\n✓ Reserved {} tickets for event #{}: reservation {reservation_id}, expires at {expires_at}",
        args.tickets, event.event_id
    );

    // ========== Step 3: redeem twice ==========
    let redeem = Request::GetTickets {
        reservation_id,
        cookie,
    };
    let first = client.call(&redeem).await?;
    let second = client.call(&redeem).await?;
    if let Response::Tickets { tickets, .. } = &first {
        let codes: Vec<String> = tickets.iter().map(ToString::to_string).collect();
        println!("✓ Tickets: {}", codes.join(" "));
    } else {
        println!("❌ Redemption refused: {first:?}");
    }
    println!(
        "✓ Second redemption returns the same tickets: {}",
        first == second
    );

    // ========== Step 4: wrong cookie ==========
    let wrong = client
        .call(&Request::GetTickets {
            reservation_id,
            cookie: Cookie::new([b'!'; COOKIE_LEN]),
        })
        .await?;
    println!("✓ Wrong cookie answered with {}", wrong.name());

    println!("\n🎫 Demo complete\n");
    Ok(())
}
