use clinic_desk_server::auth::hash_password;

// Prints a PHC string for seeding staff_user.password_hash.
fn main() {
    let Some(password) = std::env::args().nth(1) else {
        eprintln!("Usage: hashpass <password>");
        std::process::exit(2);
    };
    match hash_password(&password) {
        Ok(phc) => println!("{phc}"),
        Err(e) => {
            eprintln!("argon2 hash error: {e}");
            std::process::exit(1);
        }
    }
}
