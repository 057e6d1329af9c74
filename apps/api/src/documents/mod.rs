// Save, export and download endpoints over the downloads folder.

pub mod handlers;
