mod export;
mod replay;
mod scheduling;
