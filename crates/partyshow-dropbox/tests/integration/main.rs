//! Integration tests for partyshow-dropbox
//!
//! Uses wiremock to simulate the Dropbox API and verifies end-to-end
//! behavior of the DropboxClient, folder listing, the change log,
//! long-polling and downloads.

mod common;

mod test_download;
mod test_list_folder;
mod test_longpoll;
mod test_remote_store;
