//! Walk a five-player bracket from generation to champion.
//!
//! Run with `cargo run --example bracket_walkthrough`.

use bracket_engine::bracket::{BracketEngine, BracketError};
use bracket_engine::db::{BracketRepository, MemoryRepository};
use bracket_engine::tournament::{NewParticipant, NewTournament, TournamentManager};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), BracketError> {
    let repo: Arc<dyn BracketRepository> = Arc::new(MemoryRepository::new());
    let manager = TournamentManager::new(repo.clone());
    let engine = BracketEngine::new(repo);

    let tournament = manager
        .create_tournament(NewTournament::new("Walkthrough Cup", chrono::Utc::now()))
        .await?;
    let names = ["Ada", "Barbara", "Claude", "Dennis", "Edsger"];
    manager
        .add_participants(
            tournament.id,
            names.iter().map(|n| NewParticipant::new(*n)).collect(),
        )
        .await?;

    let bracket = engine.generate_bracket(tournament.id).await?;
    println!("{} rounds, {} matches", bracket.rounds, bracket.matches.len());

    // Decide every playable match until nothing is left, always picking the
    // first participant. Bye matches stay pending.
    loop {
        let view = engine.get_bracket(tournament.id).await?;
        let Some(next) = view
            .matches
            .iter()
            .find(|m| m.is_ready() && !m.is_decided())
            .cloned()
        else {
            break;
        };
        let winner = next.participant1_id.unwrap_or_default();
        engine
            .record_result(tournament.id, next.id, winner, Some("1-0".to_string()))
            .await?;
        println!(
            "Round {} match {}: participant {} wins",
            next.round, next.match_number, winner
        );
    }

    let view = engine.get_bracket(tournament.id).await?;
    for (round, matches) in view.rounds() {
        let line: Vec<String> = matches
            .iter()
            .map(|m| format!("{:?} vs {:?} -> {:?}", m.participant1_id, m.participant2_id, m.winner_id))
            .collect();
        println!("Round {round}: {}", line.join(" | "));
    }
    println!("Status: {}", view.tournament.status);

    Ok(())
}
