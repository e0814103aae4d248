//! Basic schyntax API walkthrough: parse, evaluate, match, display.

use schyntax::Schedule;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse a schedule expression
    let schedule: Schedule = "dow(mon..fri), hour(9..17), min(0, 30)".parse()?;
    println!("Parsed: {}", schedule.source());
    println!("Canonical: {schedule}");

    // Next and previous relative to a fixed instant
    let now: jiff::civil::DateTime = "2025-06-15T08:00:00".parse()?;
    println!("\nNext after {now}: {}", schedule.next_from(now)?);
    println!("Previous at or before {now}: {}", schedule.previous_from(now)?);

    // Relative to the current UTC time
    println!("\nNext from now: {}", schedule.next()?);

    // Check if a datetime matches the schedule
    let monday_9am: jiff::civil::DateTime = "2025-06-16T09:00:00".parse()?;
    println!("\n{monday_9am} matches: {}", schedule.matches(monday_9am));

    let sunday_9am: jiff::civil::DateTime = "2025-06-15T09:00:00".parse()?;
    println!("{sunday_9am} matches: {}", schedule.matches(sunday_9am));

    // Parse errors point at the offending token
    if let Err(err) = Schedule::parse("hour(9..25)") {
        println!("\n{}", err.display_rich());
    }

    // Display roundtrips through parsing
    let roundtripped: Schedule = schedule.to_string().parse()?;
    assert_eq!(schedule, roundtripped);
    println!("\nRoundtrip: {roundtripped}");

    Ok(())
}
