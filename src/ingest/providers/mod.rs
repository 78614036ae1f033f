pub mod yahoo_rss;
