//! # Dot Commands
//!
//! Introspection commands for the interactive shell. Anything starting with
//! `.` lands here instead of the query layer.

use eyre::Result;

use crate::Database;

pub fn is_command(line: &str) -> bool {
    line.starts_with('.')
}

pub fn execute(db: &mut Database, line: &str) -> Result<()> {
    match line {
        ".stats" | ".statistics" => show_stats(db)?,
        ".tree" => show_tree(db)?,
        ".buffer" => show_buffer(db),
        ".keys" => show_keys(db)?,
        ".clear" => print!("\x1B[H\x1B[2J"),
        ".help" => show_help(),
        other => {
            println!("Unknown command: {other}");
            println!("Type '.help' for available commands");
        }
    }
    Ok(())
}

fn show_stats(db: &mut Database) -> Result<()> {
    let stats = db.stats()?;
    println!();
    println!("Database statistics:");
    println!("  Root page:       {}", stats.root_pid);
    println!("  Tree order:      {}", stats.order);
    println!("  Total keys:      {}", stats.total_keys);
    println!("  WAL syncs:       {}", stats.wal_syncs);

    let pool = db.pool_stats();
    println!();
    println!("Buffer pool:");
    println!("  Capacity:        {} pages", pool.capacity);
    println!("  Current size:    {} pages", pool.size);
    println!("  Cache hits:      {}", pool.hits);
    println!("  Cache misses:    {}", pool.misses);
    println!("  Hit rate:        {:.2}%", pool.hit_rate * 100.0);
    println!("  Evictions:       {}", pool.evictions);
    println!("  Dirty pages:     {}", pool.dirty_pages);
    println!();
    Ok(())
}

fn show_tree(db: &mut Database) -> Result<()> {
    let stats = db.stats()?;
    let keys = db.keys()?;

    println!();
    println!("B+tree:");
    println!("  Root page:   {}", stats.root_pid);
    println!("  Order:       {}", stats.order);
    println!("  Total keys:  {}", keys.len());
    if let (Some(first), Some(last)) = (keys.first(), keys.last()) {
        println!("  Key range:   [{first}, {last}]");
    }
    println!();
    Ok(())
}

fn show_buffer(db: &Database) {
    let pool = db.pool_stats();
    println!();
    println!("Buffer pool:");
    println!("  Capacity:    {} pages ({:.1} KiB)", pool.capacity, pool.capacity as f64 * 4.0);
    println!("  Size:        {} pages", pool.size);
    println!("  Hits:        {}", pool.hits);
    println!("  Misses:      {}", pool.misses);
    println!("  Hit rate:    {:.2}%", pool.hit_rate * 100.0);
    println!("  Evictions:   {}", pool.evictions);
    println!("  Dirty pages: {}", pool.dirty_pages);
    println!();
}

fn show_keys(db: &Database) -> Result<()> {
    let keys = db.keys()?;
    if keys.is_empty() {
        println!("(empty database)");
        return Ok(());
    }

    println!();
    println!("All keys ({} total):", keys.len());
    let limit = keys.len().min(50);
    for (i, key) in keys[..limit].iter().enumerate() {
        if i > 0 && i % 10 == 0 {
            println!();
        }
        print!("{key} ");
    }
    println!();
    if keys.len() > limit {
        println!("... ({} more keys)", keys.len() - limit);
    }
    println!();
    Ok(())
}

fn show_help() {
    println!();
    println!("SQL statements:");
    println!("  INSERT INTO kv VALUES (<key>, '<value>');   insert a key-value pair");
    println!("  SELECT * FROM kv WHERE key = <key>;         look up a key");
    println!();
    println!("Simple syntax:");
    println!("  INSERT <key> <value>");
    println!("  SELECT <key>");
    println!();
    println!("Commands:");
    println!("  .stats    database statistics");
    println!("  .tree     B+tree information");
    println!("  .buffer   buffer pool statistics");
    println!("  .keys     list all keys");
    println!("  .clear    clear the screen");
    println!("  .help     this help");
    println!("  exit      leave the shell");
    println!();
}
