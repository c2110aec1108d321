/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use ews::{
    config::ServiceConfig,
    item::ItemProperties,
    operations::ItemView,
    property::PropertySet,
    types::{BaseShape, DistinguishedFolderName},
    ExchangeService,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = ServiceConfig::from_file("config.toml").expect("Unable to read config.toml");
    let service = ExchangeService::from_config(&config).expect("Unable to create service");

    // Only the first page of the inbox is listed.
    let results = service
        .find_items(
            DistinguishedFolderName::Inbox,
            ItemView::new(20),
            &PropertySet::new(BaseShape::Default),
        )
        .await
        .expect("Unable to complete request");

    println!(
        "{} of {} items in the inbox:",
        results.items.len(),
        results.total_count
    );

    for item in &results.items {
        let id = item
            .id()
            .ok()
            .flatten()
            .map(|id| id.id.chars().take(10).collect::<String>())
            .unwrap_or_default();
        let subject = item.subject().ok().flatten().unwrap_or("(no subject)");

        println!("{id}...: {subject}");
    }
}
