/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::io::{BufRead, Write};

use ews::{
    autodiscover::{AutodiscoverClient, AutodiscoverSettings},
    Error,
};
use reqwest::Client;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    print!("Enter an address: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;

    // The trailing newline would end up in the Basic authentication header.
    let address = line.trim().to_string();

    let autodiscover = AutodiscoverClient::new(Client::new());
    let settings = match autodiscover.discover(&address).await {
        Err(Error::Unauthorized) => {
            println!("Authentication needed.");
            print!("Enter a password: ");
            std::io::stdout().flush()?;
            let password = rpassword::read_password()?;

            autodiscover
                .with_password(password)
                .discover(&address)
                .await
        }
        result => result,
    };

    match settings {
        Ok(settings) => print_settings(&settings),
        Err(err) => println!("Failed to retrieve EWS endpoint: {err}"),
    }

    Ok(())
}

fn print_settings(settings: &AutodiscoverSettings) {
    if let Some(name) = &settings.display_name {
        println!("Display name: {name}");
    }
    println!("EWS endpoint URL ({}): {}", settings.protocol, settings.ews_url);
}
