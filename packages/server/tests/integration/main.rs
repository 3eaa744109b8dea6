mod common;
mod competition;
mod daily;
mod judge;
mod results;
mod submission;
